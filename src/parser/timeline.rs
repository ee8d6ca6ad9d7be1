//! Chronological merge of requests, responses, and push events.
//!
//! Requests and responses are sorted here; push events arrive pre-sorted.
//! The combined view is produced by a generic k-way merge (k = 3) instead of
//! re-sorting the full set, with a fixed source priority for equal
//! timestamps: request, then response, then push.

use std::collections::VecDeque;

use crate::models::{PushCategory, PushEntry, RecordEntry, TimelineEntry};
use crate::parser::{classify, ParsedLog};

/// Merge any number of time-ordered sequences into one. Ties are broken by
/// sequence index: the earlier-listed source wins.
pub fn merge_sorted_by<T>(lists: Vec<Vec<T>>, key: impl Fn(&T) -> &str) -> Vec<T> {
    let total: usize = lists.iter().map(Vec::len).sum();
    let mut queues: Vec<VecDeque<T>> = lists.into_iter().map(VecDeque::from).collect();
    let mut merged = Vec::with_capacity(total);

    loop {
        let mut smallest: Option<usize> = None;
        for (index, queue) in queues.iter().enumerate() {
            let Some(head) = queue.front() else { continue };
            smallest = match smallest {
                Some(best) => {
                    let best_head = queues[best].front().map(|t| key(t)).unwrap_or("");
                    if key(head) < best_head {
                        Some(index)
                    } else {
                        Some(best)
                    }
                }
                None => Some(index),
            };
        }
        let Some(index) = smallest else { break };
        if let Some(item) = queues[index].pop_front() {
            merged.push(item);
        }
    }
    merged
}

/// Split the cleaned correlation records into request-half and
/// response-half timeline entries, each stable-sorted by timestamp.
pub fn split_record_entries(log: &ParsedLog) -> (Vec<TimelineEntry>, Vec<TimelineEntry>) {
    let mut requests = Vec::new();
    let mut responses = Vec::new();

    for (id, record) in log.records.iter() {
        let (servicename, action) = match (record.protocol, &record.request) {
            (Some(protocol), Some(request)) => classify::service_and_action(request, protocol),
            _ => (String::new(), String::new()),
        };
        if let Some(request) = &record.request {
            requests.push(TimelineEntry::Record(RecordEntry {
                id: id.to_string(),
                content: request.to_string(),
                time: record.req_time.clone(),
                servicename: servicename.clone(),
                action: action.clone(),
                record_type: "request",
                protocol: record.protocol_tag(),
            }));
        }
        if let Some(response) = &record.response {
            responses.push(TimelineEntry::Record(RecordEntry {
                id: id.to_string(),
                content: response.to_string(),
                time: record.rsp_time.clone(),
                servicename,
                action,
                record_type: "response",
                protocol: record.protocol_tag(),
            }));
        }
    }

    requests.sort_by(|a, b| a.time().cmp(b.time()));
    responses.sort_by(|a, b| a.time().cmp(b.time()));
    (requests, responses)
}

/// Collect every push bucket into timeline entries, stable-sorted by time
/// (insertion order preserved within equal timestamps).
pub fn push_entries(log: &ParsedLog) -> Vec<TimelineEntry> {
    let mut entries = Vec::new();
    for category in PushCategory::ALL {
        for event in log.special.events(category) {
            entries.push(TimelineEntry::Push(PushEntry {
                content: event.payload.clone(),
                time: event.time.clone(),
                push_type: category.push_type(),
            }));
        }
    }
    entries.sort_by(|a, b| a.time().cmp(b.time()));
    entries
}

/// Build the full merged timeline for one parse run.
pub fn build(log: &ParsedLog) -> Vec<TimelineEntry> {
    let (requests, responses) = split_record_entries(log);
    let pushes = push_entries(log);
    merge_sorted_by(vec![requests, responses, pushes], |entry| entry.time())
}

/// Apply the two caller filters: an inclusive `[start, end]` range (either
/// bound may be empty), then a `~`-separated OR substring match over the
/// entry content.
pub fn filter<'a>(
    entries: &'a [TimelineEntry],
    content: &str,
    start_time: &str,
    end_time: &str,
) -> Vec<&'a TimelineEntry> {
    let substrings: Vec<&str> = if content.is_empty() {
        Vec::new()
    } else {
        content.split('~').collect()
    };

    entries
        .iter()
        .filter(|entry| {
            let time = entry.time();
            if !start_time.is_empty() && time < start_time {
                return false;
            }
            if !end_time.is_empty() && time > end_time {
                return false;
            }
            substrings.is_empty() || substrings.iter().any(|s| entry.content().contains(s))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push(time: &str, content: &str) -> TimelineEntry {
        TimelineEntry::Push(PushEntry {
            content: content.to_string(),
            time: time.to_string(),
            push_type: "response_push",
        })
    }

    fn request(time: &str, id: &str) -> TimelineEntry {
        TimelineEntry::Record(RecordEntry {
            id: id.to_string(),
            content: format!("req {id}"),
            time: time.to_string(),
            servicename: String::new(),
            action: String::new(),
            record_type: "request",
            protocol: "",
        })
    }

    fn response(time: &str, id: &str) -> TimelineEntry {
        TimelineEntry::Record(RecordEntry {
            id: id.to_string(),
            content: format!("rsp {id}"),
            time: time.to_string(),
            servicename: String::new(),
            action: String::new(),
            record_type: "response",
            protocol: "",
        })
    }

    #[test]
    fn three_way_merge_is_fully_ordered() {
        let requests = vec![request("1", "a"), request("3", "b"), request("5", "c")];
        let responses = vec![response("2", "a"), response("4", "b")];
        let pushes = vec![push("0", "p0"), push("6", "p1")];

        let merged = merge_sorted_by(vec![requests, responses, pushes], |e| e.time());
        let times: Vec<&str> = merged.iter().map(|e| e.time()).collect();
        assert_eq!(times, vec!["0", "1", "2", "3", "4", "5", "6"]);
    }

    #[test]
    fn equal_timestamps_break_ties_by_source_priority() {
        let requests = vec![request("1", "r")];
        let responses = vec![response("1", "r")];
        let pushes = vec![push("1", "p")];

        let merged = merge_sorted_by(vec![requests, responses, pushes], |e| e.time());
        let kinds: Vec<&str> = merged
            .iter()
            .map(|e| match e {
                TimelineEntry::Record(r) => r.record_type,
                TimelineEntry::Push(_) => "push",
            })
            .collect();
        assert_eq!(kinds, vec!["request", "response", "push"]);
    }

    #[test]
    fn merge_keeps_ordering_after_one_source_drains() {
        let requests = vec![request("1", "a"), request("9", "b")];
        let responses = vec![response("5", "a")];
        let pushes: Vec<TimelineEntry> = Vec::new();

        let merged = merge_sorted_by(vec![requests, responses, pushes], |e| e.time());
        let times: Vec<&str> = merged.iter().map(|e| e.time()).collect();
        assert_eq!(times, vec!["1", "5", "9"]);
    }

    #[test]
    fn time_range_filter_is_inclusive() {
        let entries = vec![push("1", "a"), push("2", "b"), push("3", "c")];
        let filtered = filter(&entries, "", "2", "3");
        let times: Vec<&str> = filtered.iter().map(|e| e.time()).collect();
        assert_eq!(times, vec!["2", "3"]);
    }

    #[test]
    fn content_filter_is_logical_or_over_tilde_list() {
        let entries = vec![push("1", "alpha"), push("2", "beta"), push("3", "gamma")];
        let filtered = filter(&entries, "alp~gam", "", "");
        let contents: Vec<&str> = filtered.iter().map(|e| e.content()).collect();
        assert_eq!(contents, vec!["alpha", "gamma"]);
    }

    #[test]
    fn filters_compose() {
        let entries = vec![push("1", "alpha"), push("2", "alpha"), push("3", "beta")];
        let filtered = filter(&entries, "alpha", "2", "3");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].time(), "2");
    }
}
