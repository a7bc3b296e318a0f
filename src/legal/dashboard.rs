use serde::Serialize;

use crate::db::{
    CaseRecord, CaseStatus, ClientRecord, DeadlineRecord, DeadlineStatus, DocumentRecord,
};

const RECENT_CASES: usize = 4;
const NEXT_DEADLINES: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeStats {
    pub clients: usize,
    pub active_clients: usize,
    pub cases: usize,
    pub active_cases: usize,
    pub deadlines: usize,
    pub overdue_deadlines: usize,
    pub documents: usize,
}

/// Landing-page summary of the practice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub stats: PracticeStats,
    pub recent_cases: Vec<CaseRecord>,
    pub next_deadlines: Vec<DeadlineRecord>,
}

pub fn summarize(
    clients: &[ClientRecord],
    cases: &[CaseRecord],
    deadlines: &[DeadlineRecord],
    documents: &[DocumentRecord],
) -> Dashboard {
    let stats = PracticeStats {
        clients: clients.len(),
        active_clients: clients.iter().filter(|c| c.active).count(),
        cases: cases.len(),
        active_cases: cases
            .iter()
            .filter(|c| c.status == CaseStatus::Active)
            .count(),
        deadlines: deadlines.len(),
        overdue_deadlines: deadlines
            .iter()
            .filter(|d| d.status == DeadlineStatus::Overdue)
            .count(),
        documents: documents.len(),
    };

    let mut recent_cases = cases.to_vec();
    recent_cases.sort_by(|a, b| b.filing_date.cmp(&a.filing_date));
    recent_cases.truncate(RECENT_CASES);

    let mut next_deadlines: Vec<DeadlineRecord> = deadlines
        .iter()
        .filter(|d| d.status != DeadlineStatus::Completed)
        .cloned()
        .collect();
    next_deadlines.sort_by(|a, b| a.due_date.cmp(&b.due_date));
    next_deadlines.truncate(NEXT_DEADLINES);

    Dashboard {
        stats,
        recent_cases,
        next_deadlines,
    }
}
