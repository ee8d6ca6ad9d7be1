//! Query facade over one completed parse run.
//!
//! Bundles the parse snapshot with the statistics index, the token
//! resolver, and the merged timeline. Domain views and the CLI consume
//! this surface only; nothing here mutates parse state.

use anyhow::Result;

use crate::models::{
    CorrelationRecord, Diagnostics, Protocol, PushCategory, PushEvent, StatRow, TimelineEntry,
};
use crate::parser::stats::StatisticsIndex;
use crate::parser::timeline;
use crate::parser::tokens::TokenResolver;
use crate::parser::{LogParser, ParsedLog};

pub struct LogAnalysis {
    log: ParsedLog,
    stats: StatisticsIndex,
    tokens: TokenResolver,
    timeline: Vec<TimelineEntry>,
}

impl LogAnalysis {
    /// Parse a list of log blobs and index the result.
    pub fn from_files(files: &[String]) -> Result<LogAnalysis> {
        let log = LogParser::new().parse(files)?;
        Ok(LogAnalysis::new(log))
    }

    pub fn new(log: ParsedLog) -> LogAnalysis {
        let stats = StatisticsIndex::build(&log);
        let tokens = TokenResolver::build(&log);
        let timeline = timeline::build(&log);
        LogAnalysis {
            log,
            stats,
            tokens,
            timeline,
        }
    }

    /// Ordered correlation ids for one (protocol, service, action) group.
    pub fn ids_for(&self, protocol: &str, servicename: &str, action: &str) -> Vec<String> {
        self.stats.ids_for(protocol, servicename, action)
    }

    pub fn record(&self, id: &str) -> Option<&CorrelationRecord> {
        self.log.records.get(id)
    }

    /// Human name for a fund token; unresolved tokens come back unchanged.
    pub fn resolve_token(&self, token: &str) -> String {
        self.tokens.resolve(token)
    }

    pub fn push_events(&self, category: PushCategory) -> &[PushEvent] {
        self.log.special.events(category)
    }

    /// Merged chronological view, optionally filtered by an inclusive time
    /// range and a `~`-separated OR substring list.
    pub fn timeline(
        &self,
        content: &str,
        start_time: &str,
        end_time: &str,
    ) -> Vec<&TimelineEntry> {
        timeline::filter(&self.timeline, content, start_time, end_time)
    }

    pub fn statistics(&self) -> Vec<StatRow> {
        self.stats.summary_rows()
    }

    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            total_records: self.log.records.len(),
            removed_records: self.log.removed.len(),
            pb_requests: self.stats.protocol_count(Protocol::Pb),
            json_requests: self.stats.protocol_count(Protocol::Json),
            funid_requests: self.stats.protocol_count(Protocol::JsonFunid),
            illegal_lines: self.log.illegal.len(),
            timeout_lines: self.log.timeout_lines.len(),
            skipped_lines: self.log.skipped_lines.len(),
            retransmit_lines: self.log.retransmit_lines.len(),
            orphan_responses: self.log.special.orphan_responses.len(),
            orphan_lines: self.log.special.orphan_lines.len(),
            log_begin_time: self.log.log_begin_time.clone(),
            log_end_time: self.log.log_end_time.clone(),
            username: self.log.username.clone(),
            userid: self.log.special.userid.clone(),
        }
    }

    /// Underlying snapshot, for the domain views.
    pub fn parsed(&self) -> &ParsedLog {
        &self.log
    }

    pub fn token_resolver(&self) -> &TokenResolver {
        &self.tokens
    }
}
