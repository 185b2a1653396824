//! Substring include/exclude filtering of step labels and log names.
//!
//! Restricts a report or plot to a subset of prior runs without rescanning:
//! a label survives iff, when include substrings are declared, at least one
//! is present, and no declared exclude substring is present.

#[derive(Debug, Clone, Default)]
pub struct StepFilter {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl StepFilter {
    #[must_use]
    pub fn new(include: &[String], exclude: &[String]) -> Self {
        Self { include: include.to_vec(), exclude: exclude.to_vec() }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Whether `label` survives the filter.
    #[must_use]
    pub fn matches(&self, label: &str) -> bool {
        if !self.include.is_empty() && !self.include.iter().any(|key| label.contains(key)) {
            return false;
        }
        !self.exclude.iter().any(|key| label.contains(key))
    }

    /// Surviving labels, in input order.
    #[must_use]
    pub fn retain<I, S>(&self, labels: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        labels.into_iter().map(Into::into).filter(|label| self.matches(label)).collect()
    }

    /// Filter qualifier appended to derived artifact names, so a filtered
    /// report is distinguishable from a full one
    /// (`.read` for includes, `.no-n=2` for excludes).
    #[must_use]
    pub fn name_suffix(&self) -> String {
        let mut suffix = String::new();
        for key in &self.include {
            suffix.push('.');
            suffix.push_str(key);
        }
        for key in &self.exclude {
            suffix.push_str(".no-");
            suffix.push_str(key);
        }
        suffix
    }
}
