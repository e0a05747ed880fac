//! Output acceptance rules.
//!
//! Some backends answer with the unmodified input instead of reporting a
//! failure. Output identical to the input is therefore never trusted as a
//! translation unless a provider opts out.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputVerdict {
    Accepted,
    Empty,
    Identical,
}

impl OutputVerdict {
    /// Empty output is always rejected; identical output only when distrusted.
    pub fn is_acceptable(self, distrust_identical: bool) -> bool {
        match self {
            OutputVerdict::Accepted => true,
            OutputVerdict::Empty => false,
            OutputVerdict::Identical => !distrust_identical,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            OutputVerdict::Accepted => "accepted",
            OutputVerdict::Empty => "empty output",
            OutputVerdict::Identical => "output identical to input",
        }
    }
}

pub fn judge_output(source: &str, translated: &str) -> OutputVerdict {
    if translated.trim().is_empty() {
        OutputVerdict::Empty
    } else if translated == source {
        OutputVerdict::Identical
    } else {
        OutputVerdict::Accepted
    }
}
