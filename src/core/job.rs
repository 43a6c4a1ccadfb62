//! Arithmetic jobs and the pure evaluator that computes them

use serde::{Deserialize, Serialize};
use std::fmt;

/// Arithmetic operation carried by a [`Job`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// `a + b`
    Add,
    /// `a - b`
    Subtract,
    /// `a * b`
    Multiply,
    /// `a / b`, truncating toward zero
    Divide,
}

impl Operation {
    /// All operations, in declaration order
    pub const ALL: [Operation; 4] = [
        Operation::Add,
        Operation::Subtract,
        Operation::Multiply,
        Operation::Divide,
    ];

    /// The infix symbol for this operation
    pub fn symbol(self) -> char {
        match self {
            Operation::Add => '+',
            Operation::Subtract => '-',
            Operation::Multiply => '*',
            Operation::Divide => '/',
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A recoverable per-job computation fault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum JobFault {
    /// The divisor was zero
    #[error("division by zero")]
    DivisionByZero,
    /// The result does not fit in an `i64`
    #[error("arithmetic overflow")]
    Overflow,
}

/// One unit of work: an operation applied to two operands
///
/// Jobs are immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Job {
    op: Operation,
    a: i64,
    b: i64,
}

impl Job {
    /// Create a job computing `a op b`
    pub fn new(op: Operation, a: i64, b: i64) -> Self {
        Self { op, a, b }
    }

    /// Create an addition job
    pub fn add(a: i64, b: i64) -> Self {
        Self::new(Operation::Add, a, b)
    }

    /// Create a subtraction job
    pub fn sub(a: i64, b: i64) -> Self {
        Self::new(Operation::Subtract, a, b)
    }

    /// Create a multiplication job
    pub fn mul(a: i64, b: i64) -> Self {
        Self::new(Operation::Multiply, a, b)
    }

    /// Create a division job
    pub fn div(a: i64, b: i64) -> Self {
        Self::new(Operation::Divide, a, b)
    }

    /// The job's operation
    pub fn op(&self) -> Operation {
        self.op
    }

    /// Left operand
    pub fn a(&self) -> i64 {
        self.a
    }

    /// Right operand
    pub fn b(&self) -> i64 {
        self.b
    }

    /// Compute this job's result
    pub fn evaluate(&self) -> Outcome {
        evaluate(self.a, self.op, self.b)
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.a, self.op, self.b)
    }
}

/// Result of computing a single job
pub type Outcome = std::result::Result<i64, JobFault>;

/// Apply `op` to `a` and `b`.
///
/// Pure and lock-free; safe to call from any worker. Arithmetic is checked, so
/// overflow surfaces as [`JobFault::Overflow`] instead of panicking.
pub fn evaluate(a: i64, op: Operation, b: i64) -> Outcome {
    let value = match op {
        Operation::Add => a.checked_add(b),
        Operation::Subtract => a.checked_sub(b),
        Operation::Multiply => a.checked_mul(b),
        Operation::Divide => {
            if b == 0 {
                return Err(JobFault::DivisionByZero);
            }
            a.checked_div(b)
        }
    };
    value.ok_or(JobFault::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluate_basic_operations() {
        assert_eq!(evaluate(2, Operation::Add, 3), Ok(5));
        assert_eq!(evaluate(10, Operation::Subtract, 4), Ok(6));
        assert_eq!(evaluate(6, Operation::Multiply, 7), Ok(42));
        assert_eq!(evaluate(17, Operation::Divide, 5), Ok(3));
        assert_eq!(evaluate(-17, Operation::Divide, 5), Ok(-3));
    }

    #[test]
    fn test_division_by_zero_is_a_fault() {
        assert_eq!(Job::div(10, 0).evaluate(), Err(JobFault::DivisionByZero));
        assert_eq!(Job::div(0, 0).evaluate(), Err(JobFault::DivisionByZero));
    }

    #[test]
    fn test_overflow_is_a_fault() {
        assert_eq!(Job::add(i64::MAX, 1).evaluate(), Err(JobFault::Overflow));
        assert_eq!(Job::sub(i64::MIN, 1).evaluate(), Err(JobFault::Overflow));
        assert_eq!(Job::mul(i64::MAX, 2).evaluate(), Err(JobFault::Overflow));
        assert_eq!(Job::div(i64::MIN, -1).evaluate(), Err(JobFault::Overflow));
    }

    #[test]
    fn test_job_display() {
        assert_eq!(Job::add(2, 3).to_string(), "2 + 3");
        assert_eq!(Job::div(10, -2).to_string(), "10 / -2");
        assert_eq!(JobFault::DivisionByZero.to_string(), "division by zero");
    }

    #[test]
    fn test_job_serde() {
        let job = Job::mul(6, 7);
        let json = serde_json::to_string(&job).expect("serialize");
        let back: Job = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(job, back);
        assert_eq!(back.op(), Operation::Multiply);
    }
}
