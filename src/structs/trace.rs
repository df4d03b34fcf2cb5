use serde::Serialize;

/// Objective values recorded once per accepted iterate
///
/// `loglik` holds the raw log-likelihood, `penalized` the log-likelihood minus the
/// penalty. Both start with the value at the initial point.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ObjectiveTrace {
    loglik: Vec<f64>,
    penalized: Vec<f64>,
}

impl ObjectiveTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, loglik: f64, penalized: f64) {
        self.loglik.push(loglik);
        self.penalized.push(penalized);
    }

    /// Append another trace after this one
    pub fn extend(&mut self, other: &ObjectiveTrace) {
        self.loglik.extend_from_slice(&other.loglik);
        self.penalized.extend_from_slice(&other.penalized);
    }

    pub fn loglik(&self) -> &[f64] {
        &self.loglik
    }

    pub fn penalized(&self) -> &[f64] {
        &self.penalized
    }

    pub fn len(&self) -> usize {
        self.loglik.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loglik.is_empty()
    }

    pub fn last(&self) -> Option<(f64, f64)> {
        Some((*self.loglik.last()?, *self.penalized.last()?))
    }

    /// Absolute change of the penalized objective over the last accepted iterate
    pub fn last_change(&self) -> Option<f64> {
        match self.penalized.as_slice() {
            [.., prev, curr] => Some((curr - prev).abs()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_change_needs_two_values() {
        let mut trace = ObjectiveTrace::new();
        assert_eq!(trace.last_change(), None);
        trace.push(-10.0, -11.0);
        assert_eq!(trace.last_change(), None);
        trace.push(-9.0, -10.5);
        assert_eq!(trace.last_change(), Some(0.5));
        assert_eq!(trace.last(), Some((-9.0, -10.5)));
    }

    #[test]
    fn extend_concatenates() {
        let mut a = ObjectiveTrace::new();
        a.push(-3.0, -4.0);
        let mut b = ObjectiveTrace::new();
        b.push(-2.0, -3.0);
        b.push(-1.0, -2.0);
        a.extend(&b);
        assert_eq!(a.len(), 3);
        assert_eq!(a.loglik(), &[-3.0, -2.0, -1.0]);
        assert_eq!(a.penalized(), &[-4.0, -3.0, -2.0]);
    }
}
