//! Pass/fail verdict for a whole run

use std::fmt;

use super::result::RunResults;

/// Final determination derived from the run's fail count
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Passed {
        total: usize,
    },
    Failed {
        total: usize,
        fail_count: usize,
        messages: Vec<String>,
    },
}

impl Verdict {
    pub fn from_results(results: &RunResults) -> Self {
        if results.is_all_passed() {
            Verdict::Passed {
                total: results.total(),
            }
        } else {
            Verdict::Failed {
                total: results.total(),
                fail_count: results.fail_count(),
                messages: results
                    .failures()
                    .zip(results.error_messages())
                    .map(|(result, message)| format!("{}: {}", result.id, message))
                    .collect(),
            }
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, Verdict::Passed { .. })
    }

    /// `Ok(())` on a passing run, otherwise one error carrying every failure
    pub fn into_result(self) -> anyhow::Result<()> {
        match self {
            Verdict::Passed { .. } => Ok(()),
            failed => Err(anyhow::anyhow!("{failed}")),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Passed { total } => write!(f, "All {total} scenarios passed"),
            Verdict::Failed {
                total,
                fail_count,
                messages,
            } => {
                write!(f, "{fail_count} of {total} scenarios failed:")?;
                for message in messages {
                    write!(f, "\n  - {message}")?;
                }
                Ok(())
            }
        }
    }
}
