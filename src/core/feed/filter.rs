use crate::core::model::LogRecord;

/// Tri-state retry filter: everything, only retried requests, or only
/// requests that went through on the first attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetriedFilter {
    #[default]
    All,
    Retried,
    NotRetried,
}

/// Filter criteria applied to the log feed. All clauses are optional and
/// conjunctive. The same predicate runs against both historical pages
/// (where the server already filtered, so it trivially holds) and push
/// arrivals (where the stream is an unfiltered firehose).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    pub group: Option<String>,
    pub model: Option<String>,
    pub retried: RetriedFilter,
    pub channel: Option<String>,
}

fn normalized(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

impl LogFilter {
    /// Exact match on the requested model name. Empty clears the clause.
    pub fn set_group(&mut self, value: &str) {
        self.group = normalized(value);
    }

    /// Exact match on the model actually used. Empty clears the clause.
    pub fn set_model(&mut self, value: &str) {
        self.model = normalized(value);
    }

    /// Match against the serving channel or any attempted channel. Empty
    /// clears the clause.
    pub fn set_channel(&mut self, value: &str) {
        self.channel = normalized(value);
    }

    pub fn is_active(&self) -> bool {
        self.group.is_some()
            || self.model.is_some()
            || self.channel.is_some()
            || self.retried != RetriedFilter::All
    }

    pub fn matches(&self, record: &LogRecord) -> bool {
        if let Some(group) = &self.group {
            if record.request_model_name != *group {
                return false;
            }
        }
        if let Some(model) = &self.model {
            if record.actual_model_name != *model {
                return false;
            }
        }

        match self.retried {
            RetriedFilter::All => {}
            RetriedFilter::Retried => {
                if !record.was_retried() {
                    return false;
                }
            }
            RetriedFilter::NotRetried => {
                if record.was_retried() {
                    return false;
                }
            }
        }

        if let Some(channel) = &self.channel {
            let matched = record.channel_name == *channel
                || record
                    .attempts
                    .iter()
                    .any(|attempt| attempt.channel_name == *channel);
            if !matched {
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{AttemptStatus, ChannelAttempt};

    fn record() -> LogRecord {
        LogRecord {
            id: 1,
            time: 1_738_000_000,
            request_model_name: "gpt-4o".to_string(),
            channel_id: 3,
            channel_name: "primary".to_string(),
            actual_model_name: "gpt-4o-2024-11-20".to_string(),
            input_tokens: 100,
            output_tokens: 20,
            ftut: 200,
            use_time: 1500,
            cost: 0.002,
            request_content: String::new(),
            response_content: String::new(),
            error: String::new(),
            attempts: Vec::new(),
            total_attempts: 1,
        }
    }

    fn attempt(channel_name: &str) -> ChannelAttempt {
        ChannelAttempt {
            channel_id: 9,
            channel_key_id: None,
            channel_name: channel_name.to_string(),
            model_name: "gpt-4o".to_string(),
            attempt_num: 1,
            status: AttemptStatus::Failed,
            duration: 400,
            sticky: false,
            msg: None,
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = LogFilter::default();
        assert!(!filter.is_active());
        assert!(filter.matches(&record()));
    }

    #[test]
    fn group_clause_is_exact_on_requested_model() {
        let mut filter = LogFilter::default();
        filter.set_group("gpt-4o");
        assert!(filter.matches(&record()));

        filter.set_group("gpt-4o-mini");
        assert!(!filter.matches(&record()));
    }

    #[test]
    fn model_clause_is_exact_on_actual_model() {
        let mut filter = LogFilter::default();
        filter.set_model("gpt-4o-2024-11-20");
        assert!(filter.matches(&record()));

        filter.set_model("gpt-4o");
        assert!(!filter.matches(&record()));
    }

    #[test]
    fn retried_clause_splits_on_attempt_count() {
        let mut retried = record();
        retried.total_attempts = 3;
        let first_try = record();

        let filter = LogFilter {
            retried: RetriedFilter::Retried,
            ..LogFilter::default()
        };
        assert!(filter.matches(&retried));
        assert!(!filter.matches(&first_try));

        let filter = LogFilter {
            retried: RetriedFilter::NotRetried,
            ..LogFilter::default()
        };
        assert!(!filter.matches(&retried));
        assert!(filter.matches(&first_try));
    }

    #[test]
    fn channel_clause_matches_attempted_channels_too() {
        let mut rec = record();
        rec.attempts = vec![attempt("fallback")];

        let mut filter = LogFilter::default();
        filter.set_channel("fallback");
        assert!(filter.matches(&rec));

        filter.set_channel("primary");
        assert!(filter.matches(&rec));

        filter.set_channel("unknown");
        assert!(!filter.matches(&rec));
    }

    #[test]
    fn setters_trim_and_clear_on_empty() {
        let mut filter = LogFilter::default();
        filter.set_group("  gpt-4o  ");
        assert_eq!(filter.group.as_deref(), Some("gpt-4o"));

        filter.set_group("   ");
        assert!(filter.group.is_none());
        assert!(!filter.is_active());
    }

    #[test]
    fn conjunction_requires_all_clauses() {
        let mut filter = LogFilter::default();
        filter.set_group("gpt-4o");
        filter.set_channel("primary");
        assert!(filter.matches(&record()));

        filter.set_channel("other");
        assert!(!filter.matches(&record()));
    }
}
