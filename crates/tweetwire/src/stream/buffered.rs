//! Buffered stream consumption: a bounded queue between the read loop and a
//! single handler task.
//!
//! The read loop (producer) classifies lines and enqueues entities; one
//! spawned task (consumer) dequeues them in arrival order and runs the
//! [`StreamProcessor`]. Once the queue is full the producer stops for good
//! and no further line is read; entities already queued are still drained.
//! A hook returning `false` closes the queue, discards whatever is still in
//! it and makes the producer stop at its next step.

use bytes::Bytes;
use futures_util::Stream;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{info, warn};

use super::{LineReader, StreamEntity, StreamProcessor};
use crate::{
    config::DEFAULT_BUFFER_CAPACITY,
    error::{TwitterError, TwitterResult},
};

/// Why the producer stopped. Every variant is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerHalt {
    /// The queue reached capacity; the rest of the stream is not read
    QueueFull,
    /// The server closed the body
    StreamClosed,
    /// The consumer asked to stop
    ConsumerStopped,
}

/// Terminal state of the consumer task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    /// Queue drained after the producer finished
    Finished,
    /// A hook returned `false`
    Stopped,
}

/// Result of a buffered session.
pub struct BufferedOutcome<P> {
    pub halt: ProducerHalt,
    pub consumer: ConsumerState,
    /// Entities handed to the processor
    pub dispatched: usize,
    /// Entities dropped from the queue after a stop
    pub discarded: usize,
    /// The processor, handed back once the consumer is done
    pub processor: P,
}

impl<P> std::fmt::Debug for BufferedOutcome<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferedOutcome")
            .field("halt", &self.halt)
            .field("consumer", &self.consumer)
            .field("dispatched", &self.dispatched)
            .field("discarded", &self.discarded)
            .finish_non_exhaustive()
    }
}

/// Runs a [`StreamProcessor`] behind a bounded FIFO queue.
#[derive(Debug)]
pub struct BufferedStreamProcessor<P> {
    processor: P,
    capacity: usize,
}

impl<P> BufferedStreamProcessor<P>
where
    P: StreamProcessor + 'static,
{
    /// Queue of [`DEFAULT_BUFFER_CAPACITY`] entities.
    pub fn new(processor: P) -> Self {
        Self::with_capacity(processor, DEFAULT_BUFFER_CAPACITY)
    }

    /// Queue of `capacity` entities (at least one).
    pub fn with_capacity(processor: P, capacity: usize) -> Self {
        Self {
            processor,
            capacity: capacity.max(1),
        }
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Consume `reader` until both halves have stopped.
    ///
    /// Must be called within a Tokio runtime; the consumer is spawned onto it.
    ///
    /// # Errors
    ///
    /// Read errors from the stream, after the consumer has drained what was
    /// already queued. [`TwitterError::ConsumerFailed`] if the consumer task
    /// was cancelled.
    pub async fn run<S, E>(self, reader: &mut LineReader<S>) -> TwitterResult<BufferedOutcome<P>>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<TwitterError>,
    {
        let (tx, rx) = mpsc::channel(self.capacity);
        info!(capacity = self.capacity, "Starting buffered stream consumer");
        let consumer = tokio::spawn(consume(rx, self.processor));

        let produced = produce(reader, &tx).await;
        drop(tx);

        let consumed = match consumer.await {
            Ok(consumed) => consumed,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => return Err(TwitterError::ConsumerFailed(e.to_string())),
        };
        let halt = produced?;

        info!(
            ?halt,
            consumer = ?consumed.state,
            dispatched = consumed.dispatched,
            discarded = consumed.discarded,
            "Buffered stream session ended"
        );

        Ok(BufferedOutcome {
            halt,
            consumer: consumed.state,
            dispatched: consumed.dispatched,
            discarded: consumed.discarded,
            processor: consumed.processor,
        })
    }
}

/// Read loop: enqueue entities until the queue fills, the body ends or the
/// consumer stops.
async fn produce<S, E>(
    reader: &mut LineReader<S>,
    tx: &mpsc::Sender<StreamEntity>,
) -> TwitterResult<ProducerHalt>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<TwitterError>,
{
    loop {
        if tx.is_closed() {
            return Ok(ProducerHalt::ConsumerStopped);
        }
        if tx.capacity() == 0 {
            warn!(
                queued = tx.max_capacity(),
                "Stream queue full, no further entities will be read"
            );
            return Ok(ProducerHalt::QueueFull);
        }

        // A stop must not wait for the next entity on a quiet stream.
        let next = tokio::select! {
            biased;
            () = tx.closed() => return Ok(ProducerHalt::ConsumerStopped),
            next = reader.next_entity() => next?,
        };
        let Some(entity) = next else {
            return Ok(ProducerHalt::StreamClosed);
        };

        match tx.try_send(entity) {
            Ok(()) => {}
            Err(TrySendError::Full(entity)) => {
                warn!(kind = entity.kind(), "Stream queue full, entity dropped");
                return Ok(ProducerHalt::QueueFull);
            }
            Err(TrySendError::Closed(_)) => return Ok(ProducerHalt::ConsumerStopped),
        }
    }
}

struct Consumed<P> {
    processor: P,
    state: ConsumerState,
    dispatched: usize,
    discarded: usize,
}

/// Consumer task: dispatch queued entities oldest first.
async fn consume<P>(mut rx: mpsc::Receiver<StreamEntity>, mut processor: P) -> Consumed<P>
where
    P: StreamProcessor,
{
    let mut dispatched = 0;
    while let Some(entity) = rx.recv().await {
        dispatched += 1;
        if processor.process_entity(entity).await {
            continue;
        }

        rx.close();
        let mut discarded = 0;
        while rx.try_recv().is_ok() {
            discarded += 1;
        }
        info!(dispatched, discarded, "Stream processor requested stop");

        return Consumed {
            processor,
            state: ConsumerState::Stopped,
            dispatched,
            discarded,
        };
    }

    Consumed {
        processor,
        state: ConsumerState::Finished,
        dispatched,
        discarded: 0,
    }
}
