//! Job batches and their results

use crate::core::job::{Job, JobFault, Outcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier assigned to a batch when it is submitted
pub type BatchId = uuid::Uuid;

/// An ordered group of jobs submitted together as one dispatch unit
///
/// A batch is owned by its producer until submitted; the pool then moves it
/// onto exactly one worker's queue.
///
/// # Example
///
/// ```rust
/// use batch_pool::{Batch, Job};
///
/// let batch = Batch::new()
///     .with_job(Job::add(2, 3))
///     .with_job(Job::div(10, 0));
/// assert_eq!(batch.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    jobs: Vec<Job>,
}

impl Batch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty batch with room for `capacity` jobs
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            jobs: Vec::with_capacity(capacity),
        }
    }

    /// Append a job, builder style
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_job(mut self, job: Job) -> Self {
        self.jobs.push(job);
        self
    }

    /// Append a job
    pub fn push(&mut self, job: Job) {
        self.jobs.push(job);
    }

    /// Number of jobs in the batch
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Whether the batch has no jobs
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// The jobs, in submission order
    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub(crate) fn into_jobs(self) -> Vec<Job> {
        self.jobs
    }
}

impl From<Vec<Job>> for Batch {
    fn from(jobs: Vec<Job>) -> Self {
        Self { jobs }
    }
}

impl FromIterator<Job> for Batch {
    fn from_iter<I: IntoIterator<Item = Job>>(iter: I) -> Self {
        Self {
            jobs: iter.into_iter().collect(),
        }
    }
}

impl Extend<Job> for Batch {
    fn extend<I: IntoIterator<Item = Job>>(&mut self, iter: I) {
        self.jobs.extend(iter);
    }
}

/// A job paired with what computing it produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    /// The job as submitted
    pub job: Job,
    /// Its value, or the fault it raised
    pub outcome: Outcome,
}

impl JobResult {
    /// Compute `job` and wrap the outcome
    pub fn compute(job: Job) -> Self {
        Self {
            job,
            outcome: job.evaluate(),
        }
    }

    /// Whether the job faulted
    pub fn is_fault(&self) -> bool {
        self.outcome.is_err()
    }
}

/// Results of one batch, in the order its jobs were submitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResults {
    /// ID assigned at submission
    pub batch_id: BatchId,
    /// Index of the worker that computed the batch
    pub worker: usize,
    /// One entry per job, submission order preserved
    pub results: Vec<JobResult>,
    /// When the worker finished the batch
    pub completed_at: DateTime<Utc>,
}

impl BatchResults {
    /// Number of results
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether there are no results
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Iterate over the results in submission order
    pub fn iter(&self) -> std::slice::Iter<'_, JobResult> {
        self.results.iter()
    }

    /// Just the outcomes, in submission order
    pub fn values(&self) -> Vec<std::result::Result<i64, JobFault>> {
        self.results.iter().map(|r| r.outcome).collect()
    }

    /// Number of jobs that faulted
    pub fn fault_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_fault()).count()
    }
}

impl IntoIterator for BatchResults {
    type Item = JobResult;
    type IntoIter = std::vec::IntoIter<JobResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

impl<'a> IntoIterator for &'a BatchResults {
    type Item = &'a JobResult;
    type IntoIter = std::slice::Iter<'a, JobResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_builder_preserves_order() {
        let mut batch = Batch::new().with_job(Job::add(1, 1)).with_job(Job::sub(5, 2));
        batch.push(Job::mul(3, 3));

        assert_eq!(batch.len(), 3);
        assert_eq!(
            batch.jobs(),
            &[Job::add(1, 1), Job::sub(5, 2), Job::mul(3, 3)]
        );
    }

    #[test]
    fn test_batch_from_iterator() {
        let batch: Batch = (1..=4).map(|i| Job::mul(i, i)).collect();
        assert_eq!(batch.len(), 4);
        assert!(!batch.is_empty());
        assert!(Batch::new().is_empty());
    }

    #[test]
    fn test_batch_extend_appends_after_existing_jobs() {
        let mut batch = Batch::with_capacity(3);
        assert!(batch.is_empty());

        batch.push(Job::add(1, 2));
        batch.extend(vec![Job::div(8, 2), Job::sub(0, 1)]);

        assert_eq!(
            batch.jobs(),
            &[Job::add(1, 2), Job::div(8, 2), Job::sub(0, 1)]
        );
    }

    #[test]
    fn test_batch_results_faults_and_values() {
        let results = BatchResults {
            batch_id: BatchId::nil(),
            worker: 0,
            results: vec![
                JobResult::compute(Job::add(2, 3)),
                JobResult::compute(Job::div(1, 0)),
            ],
            completed_at: Utc::now(),
        };

        assert_eq!(results.len(), 2);
        assert_eq!(results.fault_count(), 1);
        assert_eq!(results.values(), vec![Ok(5), Err(JobFault::DivisionByZero)]);
    }

    #[test]
    fn test_batch_results_json_export() {
        let results = BatchResults {
            batch_id: BatchId::nil(),
            worker: 2,
            results: vec![JobResult::compute(Job::mul(6, 7))],
            completed_at: Utc::now(),
        };

        let json = serde_json::to_value(&results).expect("serialize");
        assert_eq!(json["worker"], 2);
        assert_eq!(json["results"][0]["outcome"]["Ok"], 42);
    }
}
