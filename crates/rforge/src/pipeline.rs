//! Frame dispatch from link bytes to typed events.

use std::sync::Arc;

use bytes::Bytes;
use rforge_frame::{Command, Frame, FrameCodec, LinkCounters, ParserMode, ProtocolArbiter};
use rforge_record::{RecordChunk, RecordError, RecordWriter};
use rforge_stream::{decode_payload, now_us, DataAggregator, DataFrame};
use rforge_var::{parse_read_reply, parse_var_table, MemoryValue, VarStore, VariableDescriptor};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::error::{PipelineError, Result};

/// A decoded link message, handed to the consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    /// The device acknowledged a command.
    Ack { sequence: u16, payload: Bytes },
    /// A variable table was received and installed in the store.
    VarTable(Vec<VariableDescriptor>),
    /// A batch of memory reads was received and applied to the store.
    MemoryValues(Vec<MemoryValue>),
    /// Streamed channel samples.
    Data(DataFrame),
    /// A frame with no typed decoding (ping, echoes, unknown commands).
    Raw(Frame),
    /// A typed frame whose payload could not be decoded.
    Undecoded(Frame),
}

/// Ingestion path for one device link.
///
/// Feeds bytes to a [`ProtocolArbiter`], decodes each frame by command
/// and sends the result as a [`LinkEvent`]. Variable replies update the
/// [`VarStore`]; stream samples go to the shared [`DataAggregator`] and,
/// while a record is open, to the [`RecordWriter`].
///
/// One task owns the pipeline; the store, aggregator and recorder are
/// shared with readers through `Arc`.
#[derive(Debug)]
pub struct Pipeline {
    arbiter: ProtocolArbiter,
    vars: Arc<VarStore>,
    aggregator: Arc<DataAggregator>,
    recorder: Option<Arc<RecordWriter>>,
    events: mpsc::Sender<LinkEvent>,
}

impl Pipeline {
    /// Pipeline in auto-detect mode with fresh store and aggregator.
    pub fn new(events: mpsc::Sender<LinkEvent>) -> Self {
        Self {
            arbiter: ProtocolArbiter::new(ParserMode::Auto),
            vars: Arc::new(VarStore::new()),
            aggregator: Arc::new(DataAggregator::new()),
            recorder: None,
            events,
        }
    }

    pub fn with_arbiter(mut self, arbiter: ProtocolArbiter) -> Self {
        self.arbiter = arbiter;
        self
    }

    pub fn with_aggregator(mut self, aggregator: Arc<DataAggregator>) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn with_var_store(mut self, vars: Arc<VarStore>) -> Self {
        self.vars = vars;
        self
    }

    /// Persist stream payloads through `recorder` whenever it is recording.
    pub fn with_recorder(mut self, recorder: Arc<RecordWriter>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn arbiter(&self) -> &ProtocolArbiter {
        &self.arbiter
    }

    pub fn arbiter_mut(&mut self) -> &mut ProtocolArbiter {
        &mut self.arbiter
    }

    pub fn vars(&self) -> &Arc<VarStore> {
        &self.vars
    }

    pub fn aggregator(&self) -> &Arc<DataAggregator> {
        &self.aggregator
    }

    pub fn counters(&self) -> LinkCounters {
        self.arbiter.counters()
    }

    /// Encode an outbound command for the active protocol.
    pub fn encode(&mut self, command: Command, payload: &[u8]) -> Result<Bytes> {
        Ok(self.arbiter.encode_command(command, payload)?)
    }

    /// Feed inbound link bytes and dispatch every frame they complete.
    ///
    /// Returns the number of frames dispatched.
    pub async fn ingest(&mut self, bytes: &[u8]) -> Result<usize> {
        self.arbiter.feed(bytes);
        let mut dispatched = 0;
        while let Some(frame) = self.arbiter.pop_frame() {
            self.dispatch(frame).await?;
            dispatched += 1;
        }
        Ok(dispatched)
    }

    /// Decode one frame by command and emit its event.
    pub async fn dispatch(&mut self, frame: Frame) -> Result<()> {
        trace!(
            command = %frame.command,
            sequence = frame.sequence,
            len = frame.payload.len(),
            "frame"
        );
        let event = match frame.command {
            Command::Ack => LinkEvent::Ack {
                sequence: frame.sequence,
                payload: frame.payload,
            },
            Command::GetVarTable => match parse_var_table(&frame.payload) {
                Some(descriptors) => {
                    debug!(count = descriptors.len(), "variable table received");
                    self.vars.set_descriptors(descriptors.clone());
                    LinkEvent::VarTable(descriptors)
                }
                None => undecoded(frame),
            },
            Command::ReadMemBatch => match parse_read_reply(&frame.payload) {
                Some(values) => {
                    self.vars.apply_read_reply(&values);
                    LinkEvent::MemoryValues(values)
                }
                None => undecoded(frame),
            },
            Command::StreamData => {
                let received_at = now_us();
                match decode_payload(&frame.payload, Some(received_at)) {
                    Some(data) => {
                        self.aggregator.append(data.clone());
                        self.record(received_at, &frame.payload).await;
                        LinkEvent::Data(data)
                    }
                    None => undecoded(frame),
                }
            }
            _ => LinkEvent::Raw(frame),
        };
        self.events
            .send(event)
            .await
            .map_err(|_| PipelineError::EventsClosed)
    }

    /// Persist a stream payload. A failed append is logged and the live
    /// path carries on; the recorder keeps its own state.
    async fn record(&self, received_at: u64, payload: &Bytes) {
        let Some(recorder) = &self.recorder else {
            return;
        };
        if !recorder.is_recording() {
            return;
        }
        let chunk = RecordChunk::new(received_at, received_at, payload.clone());
        match recorder.append(&chunk).await {
            Ok(()) => {}
            // Recording stopped between the check and the append.
            Err(RecordError::NotRecording) => {}
            Err(err) => warn!(error = %err, len = payload.len(), "record append failed"),
        }
    }
}

fn undecoded(frame: Frame) -> LinkEvent {
    warn!(command = %frame.command, len = frame.payload.len(), "frame payload did not decode");
    LinkEvent::Undecoded(frame)
}
