//! Endpoint catalog: logical call name to method, URL and parameter names.

use tweetwire_oauth::{Method, percent_encode};

use crate::model::ModelTag;

/// Description of one REST or streaming endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Logical call name, e.g. `home_timeline`
    pub name: &'static str,

    pub method: Method,

    /// Host override; the configured API host is used when absent
    pub host: Option<&'static str>,

    /// Path below the API root with `{param}` placeholders
    pub path: &'static str,

    /// Parameters substituted into `path`, in positional order
    pub url_params: &'static [&'static str],

    pub required_params: &'static [&'static str],

    pub optional_params: &'static [&'static str],

    /// Response shape; `None` returns the raw body
    pub model: Option<ModelTag>,

    /// Persistent streaming response
    pub streaming: bool,
}

impl Endpoint {
    /// URL, required and optional parameter names, in positional order.
    pub fn param_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.url_params
            .iter()
            .chain(self.required_params)
            .chain(self.optional_params)
            .copied()
    }

    /// Check if `key` is a parameter of this endpoint.
    #[must_use]
    pub fn accepts(&self, key: &str) -> bool {
        self.param_names().any(|name| name == key)
    }

    /// Expand the path template with percent-encoded URL parameter values.
    ///
    /// Placeholders without a value are left in place.
    #[must_use]
    pub fn expand_path(&self, values: &[(String, String)]) -> String {
        values.iter().fold(self.path.to_string(), |path, (key, value)| {
            path.replace(&format!("{{{key}}}"), &percent_encode(value))
        })
    }
}

/// Lookup of endpoints by logical call name.
///
/// Entries are consumed as given; the client does not validate them.
pub trait EndpointCatalog: Send + Sync {
    fn lookup(&self, name: &str) -> Option<&Endpoint>;
}

/// Catalog of the REST v1.1 and streaming endpoints shipped with the crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinCatalog;

impl EndpointCatalog for BuiltinCatalog {
    fn lookup(&self, name: &str) -> Option<&Endpoint> {
        BUILTIN_ENDPOINTS.iter().find(|endpoint| endpoint.name == name)
    }
}

impl BuiltinCatalog {
    /// All builtin endpoints.
    #[must_use]
    pub const fn endpoints(&self) -> &'static [Endpoint] {
        BUILTIN_ENDPOINTS
    }
}

const fn rest(
    name: &'static str,
    method: Method,
    path: &'static str,
    url_params: &'static [&'static str],
    required_params: &'static [&'static str],
    optional_params: &'static [&'static str],
    model: Option<ModelTag>,
) -> Endpoint {
    Endpoint {
        name,
        method,
        host: None,
        path,
        url_params,
        required_params,
        optional_params,
        model,
        streaming: false,
    }
}

const fn streaming(
    name: &'static str,
    method: Method,
    host: &'static str,
    path: &'static str,
    optional_params: &'static [&'static str],
) -> Endpoint {
    Endpoint {
        name,
        method,
        host: Some(host),
        path,
        url_params: &[],
        required_params: &[],
        optional_params,
        model: None,
        streaming: true,
    }
}

const TIMELINE_PARAMS: &[&str] = &[
    "count",
    "since_id",
    "max_id",
    "trim_user",
    "exclude_replies",
    "include_entities",
];

const USER_SELECTOR: &[&str] = &["user_id", "screen_name", "include_entities"];

const ID_PAGE_PARAMS: &[&str] = &["user_id", "screen_name", "cursor", "stringify_ids", "count"];

static BUILTIN_ENDPOINTS: &[Endpoint] = &[
    // Account
    rest(
        "verify_credentials",
        Method::Get,
        "account/verify_credentials.json",
        &[],
        &[],
        &["include_entities", "skip_status"],
        Some(ModelTag::User),
    ),
    rest(
        "update_profile_image",
        Method::Post,
        "account/update_profile_image.json",
        &[],
        &["image"],
        &["include_entities", "skip_status"],
        Some(ModelTag::User),
    ),
    rest(
        "update_profile_banner",
        Method::Post,
        "account/update_profile_banner.json",
        &[],
        &["banner"],
        &["width", "height", "offset_left", "offset_top"],
        None,
    ),
    // Timelines
    rest(
        "home_timeline",
        Method::Get,
        "statuses/home_timeline.json",
        &[],
        &[],
        TIMELINE_PARAMS,
        Some(ModelTag::Statuses),
    ),
    rest(
        "mentions_timeline",
        Method::Get,
        "statuses/mentions_timeline.json",
        &[],
        &[],
        TIMELINE_PARAMS,
        Some(ModelTag::Statuses),
    ),
    rest(
        "user_timeline",
        Method::Get,
        "statuses/user_timeline.json",
        &[],
        &[],
        &[
            "user_id",
            "screen_name",
            "count",
            "since_id",
            "max_id",
            "trim_user",
            "exclude_replies",
            "include_rts",
        ],
        Some(ModelTag::Statuses),
    ),
    // Statuses
    rest(
        "get_status",
        Method::Get,
        "statuses/show.json",
        &[],
        &["id"],
        &["trim_user", "include_my_retweet", "include_entities"],
        Some(ModelTag::Status),
    ),
    rest(
        "update_status",
        Method::Post,
        "statuses/update.json",
        &[],
        &["status"],
        &[
            "in_reply_to_status_id",
            "possibly_sensitive",
            "lat",
            "long",
            "place_id",
            "display_coordinates",
            "trim_user",
            "media_ids",
        ],
        Some(ModelTag::Status),
    ),
    rest(
        "delete_status",
        Method::Post,
        "statuses/destroy/{id}.json",
        &["id"],
        &[],
        &["trim_user"],
        Some(ModelTag::Status),
    ),
    rest(
        "retweet",
        Method::Post,
        "statuses/retweet/{id}.json",
        &["id"],
        &[],
        &["trim_user"],
        Some(ModelTag::Status),
    ),
    rest(
        "retweets",
        Method::Get,
        "statuses/retweets/{id}.json",
        &["id"],
        &[],
        &["count", "trim_user"],
        Some(ModelTag::Statuses),
    ),
    rest(
        "retweeter_ids",
        Method::Get,
        "statuses/retweeters/ids.json",
        &[],
        &["id"],
        &["cursor", "stringify_ids"],
        Some(ModelTag::CursoredIds),
    ),
    Endpoint {
        host: Some("upload.twitter.com"),
        ..rest(
            "upload_media",
            Method::Post,
            "media/upload.json",
            &[],
            &["media"],
            &[],
            None,
        )
    },
    // Search
    rest(
        "search_tweets",
        Method::Get,
        "search/tweets.json",
        &[],
        &["q"],
        &[
            "geocode",
            "lang",
            "locale",
            "result_type",
            "count",
            "until",
            "since_id",
            "max_id",
            "include_entities",
        ],
        Some(ModelTag::SearchResult),
    ),
    // Users
    rest(
        "get_user",
        Method::Get,
        "users/show.json",
        &[],
        &[],
        USER_SELECTOR,
        Some(ModelTag::User),
    ),
    rest(
        "lookup_users",
        Method::Get,
        "users/lookup.json",
        &[],
        &[],
        USER_SELECTOR,
        Some(ModelTag::Users),
    ),
    rest(
        "search_users",
        Method::Get,
        "users/search.json",
        &[],
        &["q"],
        &["page", "count", "include_entities"],
        Some(ModelTag::Users),
    ),
    // Friendships
    rest(
        "follow",
        Method::Post,
        "friendships/create.json",
        &[],
        &[],
        &["user_id", "screen_name", "follow"],
        Some(ModelTag::User),
    ),
    rest(
        "unfollow",
        Method::Post,
        "friendships/destroy.json",
        &[],
        &[],
        &["user_id", "screen_name"],
        Some(ModelTag::User),
    ),
    rest(
        "followers_ids",
        Method::Get,
        "followers/ids.json",
        &[],
        &[],
        ID_PAGE_PARAMS,
        Some(ModelTag::CursoredIds),
    ),
    rest(
        "friends_ids",
        Method::Get,
        "friends/ids.json",
        &[],
        &[],
        ID_PAGE_PARAMS,
        Some(ModelTag::CursoredIds),
    ),
    rest(
        "no_retweets_ids",
        Method::Get,
        "friendships/no_retweets/ids.json",
        &[],
        &[],
        &["stringify_ids"],
        Some(ModelTag::IdList),
    ),
    // Direct messages
    rest(
        "direct_messages",
        Method::Get,
        "direct_messages.json",
        &[],
        &[],
        &["since_id", "max_id", "count", "include_entities", "skip_status"],
        Some(ModelTag::DirectMessages),
    ),
    rest(
        "send_message",
        Method::Post,
        "direct_messages/new.json",
        &[],
        &["text"],
        &["user_id", "screen_name"],
        Some(ModelTag::DirectMessage),
    ),
    // Favorites
    rest(
        "favorite",
        Method::Post,
        "favorites/create.json",
        &[],
        &["id"],
        &["include_entities"],
        Some(ModelTag::Status),
    ),
    rest(
        "unfavorite",
        Method::Post,
        "favorites/destroy.json",
        &[],
        &["id"],
        &["include_entities"],
        Some(ModelTag::Status),
    ),
    // Trends
    rest(
        "trends_place",
        Method::Get,
        "trends/place.json",
        &[],
        &["id"],
        &["exclude"],
        None,
    ),
    // Streaming
    streaming(
        "user_stream",
        Method::Get,
        "userstream.twitter.com",
        "user.json",
        &[
            "delimited",
            "stall_warnings",
            "with",
            "replies",
            "track",
            "locations",
            "stringify_friend_ids",
        ],
    ),
    streaming(
        "sample_stream",
        Method::Get,
        "stream.twitter.com",
        "statuses/sample.json",
        &["delimited", "stall_warnings"],
    ),
    streaming(
        "filter_stream",
        Method::Post,
        "stream.twitter.com",
        "statuses/filter.json",
        &["follow", "track", "locations", "delimited", "stall_warnings"],
    ),
];
