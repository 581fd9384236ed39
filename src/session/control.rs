//! Control reader for inbound unidirectional streams.

use tracing::{debug, warn};

use super::condition::{ConditionHandle, NetworkCondition};
use super::config::{FramingPolicy, SessionConfig};
use super::error::{SessionError, SessionResult};
use super::stats::StatsCounters;
use crate::protocol::{AtomReader, Message};
use crate::transport::RecvStream;

/// Read atoms from one control stream until it ends.
///
/// Throttle messages are applied to `condition` in arrival order. Any other
/// message is ignored. A framing error stops the stream with the configured
/// reset code and is returned, tagged with the configured policy.
pub(crate) async fn read_control<R, C>(
    stream: R,
    condition: &ConditionHandle<C>,
    config: &SessionConfig,
    stats: &StatsCounters,
) -> SessionResult<()>
where
    R: RecvStream,
    C: NetworkCondition,
{
    let mut reader = AtomReader::new(stream);

    loop {
        match reader.read_message().await {
            Ok(None) => {
                debug!("control stream finished");
                return Ok(());
            }
            Ok(Some(Message::Throttle(throttle))) => {
                debug!(
                    rate = throttle.rate,
                    buffer = throttle.buffer,
                    loss = throttle.loss,
                    "throttle"
                );
                if condition.apply(&throttle) {
                    StatsCounters::incr(&stats.throttles_applied);
                }
            }
            Ok(Some(msg)) => {
                debug!(?msg, "ignoring control message");
            }
            Err(error) => {
                warn!(error = %error, code = config.reset_code, "stopping control stream");
                reader.get_mut().stop(config.reset_code);

                let fatal = config.framing_policy == FramingPolicy::Fatal;
                if !fatal {
                    StatsCounters::incr(&stats.stream_errors);
                }
                return Err(SessionError::Framing { error, fatal });
            }
        }
    }
}
