use crate::types::{keys, SinkRecord};

const UNSET_PRIORITY: i64 = -1;

/// Effective session priority. A sink whose every port reports
/// "not available" is demoted to 0 regardless of its configured priority.
pub fn effective_priority(sink: &SinkRecord) -> i64 {
    let all_unavailable = !sink.ports.is_empty()
        && sink
            .ports
            .iter()
            .all(|port| port.availability.trim().eq_ignore_ascii_case("not available"));
    if all_unavailable {
        return 0;
    }

    sink.property(keys::PRIORITY_SESSION)
        .and_then(|p| p.trim().parse().ok())
        .unwrap_or(UNSET_PRIORITY)
}

/// Object id of the best physical sink, by priority then index.
pub fn highest_priority_sink(sinks: &[SinkRecord]) -> Option<u32> {
    let mut best: Option<(i64, i64, u32)> = None;

    for sink in sinks {
        let Some(object_id) = sink.object_id else {
            continue;
        };
        if sink.is_virtual() {
            continue;
        }

        let priority = effective_priority(sink);
        let index = sink.index.map(i64::from).unwrap_or(-1);

        let better = match best {
            None => true,
            Some((best_priority, best_index, _)) => {
                priority > best_priority || (priority == best_priority && index > best_index)
            }
        };
        if better {
            best = Some((priority, index, object_id));
        }
    }

    best.map(|(_, _, object_id)| object_id)
}
