//! In-memory grade storage keyed by student.
//!
//! [`StudentRegistry`] owns a map from student identifier to the ordered
//! sequence of that student's [`GradeRecord`]s. Every operation takes the lock
//! for the duration of a single scan of one student's sequence and releases it
//! before returning; nothing here awaits while holding it.
//!
//! ## Invariants
//!
//! - Every record in a student's sequence carries that student's id.
//! - Amend only ever rewrites `score`; the set of keys present never changes.
//! - Records are never removed.

use crate::server::config::DuplicatePolicy;
use grade_registry_core::{
    Error, Result,
    types::{GradeRecord, RecordKey},
};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Process-wide grade store, shared by every call through an `Arc`.
#[derive(Debug, Default)]
pub struct StudentRegistry {
    students: RwLock<HashMap<String, Vec<GradeRecord>>>,
    duplicate_policy: DuplicatePolicy,
}

impl StudentRegistry {
    pub fn new(duplicate_policy: DuplicatePolicy) -> Self {
        Self {
            students: RwLock::new(HashMap::new()),
            duplicate_policy,
        }
    }

    /// Appends `record` to its student's sequence, creating the sequence for
    /// a new student.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateRecord`] when the policy is [`DuplicatePolicy::Reject`]
    /// and the student already holds a record with the same key.
    pub fn add(&self, record: GradeRecord) -> Result<()> {
        let mut students = self.students.write();
        let grades = students.entry(record.student_id.clone()).or_default();

        if self.duplicate_policy == DuplicatePolicy::Reject
            && grades.iter().any(|g| g.matches(&record.key()))
        {
            return Err(Error::DuplicateRecord {
                key: record.key().to_string(),
                student_id: record.student_id,
            });
        }

        grades.push(record);
        Ok(())
    }

    /// Overwrites the score of the first record matching `key`.
    ///
    /// # Errors
    ///
    /// [`Error::RecordNotFound`] when the student is unknown or holds no
    /// matching record. Nothing is created in that case.
    pub fn amend(&self, student_id: &str, key: RecordKey<'_>, score: f64) -> Result<GradeRecord> {
        let mut students = self.students.write();
        students
            .get_mut(student_id)
            .and_then(|grades| grades.iter_mut().find(|g| g.matches(&key)))
            .map(|grade| {
                grade.score = score;
                grade.clone()
            })
            .ok_or_else(|| Error::RecordNotFound {
                student_id: student_id.to_string(),
                key: key.to_string(),
            })
    }

    /// Returns the first-inserted record of the student in `discipline_code`,
    /// regardless of year and term.
    pub fn query(&self, student_id: &str, discipline_code: &str) -> Result<GradeRecord> {
        let students = self.students.read();
        students
            .get(student_id)
            .and_then(|grades| grades.iter().find(|g| g.discipline_code == discipline_code))
            .cloned()
            .ok_or_else(|| Error::DisciplineNotFound {
                student_id: student_id.to_string(),
                discipline_code: discipline_code.to_string(),
            })
    }

    /// Unweighted arithmetic mean of every score the student holds.
    pub fn average(&self, student_id: &str) -> Result<f64> {
        let students = self.students.read();
        match students.get(student_id) {
            None => Err(Error::StudentNotFound {
                student_id: student_id.to_string(),
            }),
            Some(grades) if grades.is_empty() => Err(Error::NoGrades {
                student_id: student_id.to_string(),
            }),
            Some(grades) => {
                let sum: f64 = grades.iter().map(|g| g.score).sum();
                Ok(sum / grades.len() as f64)
            }
        }
    }

    /// Copies the student's sequence in insertion order.
    ///
    /// The copy is taken under a single short read lock so callers can emit
    /// it without blocking writers. An unknown student yields an empty copy.
    pub fn snapshot(&self, student_id: &str) -> Vec<GradeRecord> {
        self.students
            .read()
            .get(student_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn student_count(&self) -> usize {
        self.students.read().len()
    }

    pub fn record_count(&self) -> usize {
        self.students.read().values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn key(discipline_code: &str, year: i32, term: i32) -> RecordKey<'_> {
        RecordKey {
            discipline_code,
            year,
            term,
        }
    }

    fn seeded() -> StudentRegistry {
        let registry = StudentRegistry::default();
        registry
            .add(GradeRecord::new("A1", "MATH", 2024, 1, 8.5))
            .unwrap();
        registry
            .add(GradeRecord::new("A1", "PHYS", 2024, 1, 7.0))
            .unwrap();
        registry
    }

    #[test]
    fn add_is_cumulative_even_with_colliding_keys() {
        let registry = StudentRegistry::default();
        for i in 0..5 {
            registry
                .add(GradeRecord::new("A1", "MATH", 2024, 1, f64::from(i)))
                .unwrap();
        }

        let grades = registry.snapshot("A1");
        assert_eq!(grades.len(), 5);
        let scores: Vec<f64> = grades.iter().map(|g| g.score).collect();
        assert_eq!(scores, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(registry.student_count(), 1);
        assert_eq!(registry.record_count(), 5);
    }

    #[test]
    fn reject_policy_refuses_duplicate_keys() {
        let registry = StudentRegistry::new(DuplicatePolicy::Reject);
        registry
            .add(GradeRecord::new("A1", "MATH", 2024, 1, 8.5))
            .unwrap();

        let err = registry
            .add(GradeRecord::new("A1", "MATH", 2024, 1, 2.0))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateRecord { .. }));

        // A different term is a different key.
        registry
            .add(GradeRecord::new("A1", "MATH", 2024, 2, 6.0))
            .unwrap();
        // Another student may hold the same key.
        registry
            .add(GradeRecord::new("B2", "MATH", 2024, 1, 5.0))
            .unwrap();

        assert_eq!(registry.snapshot("A1").len(), 2);
        assert_eq!(registry.snapshot("A1")[0].score, 8.5);
    }

    #[test]
    fn amend_changes_only_the_matching_score() {
        let registry = seeded();
        let before = registry.snapshot("A1");

        let amended = registry.amend("A1", key("MATH", 2024, 1), 9.5).unwrap();
        assert_eq!(amended, GradeRecord::new("A1", "MATH", 2024, 1, 9.5));

        let after = registry.snapshot("A1");
        assert_eq!(after.len(), before.len());
        assert_eq!(after[0].score, 9.5);
        assert_eq!(after[0].key(), before[0].key());
        assert_eq!(after[1], before[1]);
    }

    #[test]
    fn amend_of_missing_key_changes_nothing() {
        let registry = seeded();
        let before = registry.snapshot("A1");

        let err = registry.amend("A1", key("MATH", 2024, 2), 1.0).unwrap_err();
        assert!(matches!(err, Error::RecordNotFound { .. }));
        assert_eq!(registry.snapshot("A1"), before);

        let err = registry.amend("ZZ", key("MATH", 2024, 1), 1.0).unwrap_err();
        assert!(err.is_domain_miss());
        assert_eq!(registry.student_count(), 1);
    }

    #[test]
    fn amend_hits_first_duplicate_only() {
        let registry = StudentRegistry::default();
        registry
            .add(GradeRecord::new("A1", "MATH", 2024, 1, 1.0))
            .unwrap();
        registry
            .add(GradeRecord::new("A1", "MATH", 2024, 1, 2.0))
            .unwrap();

        registry.amend("A1", key("MATH", 2024, 1), 10.0).unwrap();
        let scores: Vec<f64> = registry.snapshot("A1").iter().map(|g| g.score).collect();
        assert_eq!(scores, vec![10.0, 2.0]);
    }

    #[test]
    fn query_returns_first_inserted_discipline_match() {
        let registry = StudentRegistry::default();
        registry
            .add(GradeRecord::new("A1", "MATH", 2023, 2, 6.0))
            .unwrap();
        registry
            .add(GradeRecord::new("A1", "MATH", 2024, 1, 9.0))
            .unwrap();

        let grade = registry.query("A1", "MATH").unwrap();
        assert_eq!((grade.year, grade.term, grade.score), (2023, 2, 6.0));
    }

    #[test]
    fn query_misses_are_domain_outcomes() {
        let registry = seeded();
        assert!(matches!(
            registry.query("A1", "CHEM"),
            Err(Error::DisciplineNotFound { .. })
        ));
        assert!(registry.query("nobody", "MATH").unwrap_err().is_domain_miss());
    }

    #[test]
    fn average_is_unweighted_mean() {
        let registry = seeded();
        let avg = registry.average("A1").unwrap();
        assert!((avg - 7.75).abs() < f64::EPSILON);

        registry
            .add(GradeRecord::new("A1", "CHEM", 2025, 2, 3.0))
            .unwrap();
        let avg = registry.average("A1").unwrap();
        assert!((avg - (8.5 + 7.0 + 3.0) / 3.0).abs() < 1e-12);
    }

    #[test]
    fn average_of_unknown_student_is_not_found() {
        let registry = StudentRegistry::default();
        assert_eq!(
            registry.average("A1"),
            Err(Error::StudentNotFound {
                student_id: "A1".into()
            })
        );
    }

    #[test]
    fn snapshot_of_unknown_student_is_empty() {
        let registry = seeded();
        assert!(registry.snapshot("nobody").is_empty());
        // Reading must not create a sequence.
        assert_eq!(registry.student_count(), 1);
    }

    #[test]
    fn snapshot_is_detached_from_later_writes() {
        let registry = seeded();
        let snapshot = registry.snapshot("A1");
        registry.amend("A1", key("MATH", 2024, 1), 0.0).unwrap();
        registry
            .add(GradeRecord::new("A1", "CHEM", 2024, 1, 5.0))
            .unwrap();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].score, 8.5);
    }

    #[test]
    fn concurrent_adds_stay_isolated_per_student() {
        const STUDENTS: usize = 16;
        const PER_STUDENT: usize = 250;

        let registry = Arc::new(StudentRegistry::default());
        let handles: Vec<_> = (0..STUDENTS)
            .map(|s| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    let student_id = format!("S{s}");
                    for i in 0..PER_STUDENT {
                        registry
                            .add(GradeRecord::new(
                                student_id.clone(),
                                format!("D{i}"),
                                2024,
                                1,
                                i as f64,
                            ))
                            .unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.student_count(), STUDENTS);
        assert_eq!(registry.record_count(), STUDENTS * PER_STUDENT);
        for s in 0..STUDENTS {
            let student_id = format!("S{s}");
            let grades = registry.snapshot(&student_id);
            assert_eq!(grades.len(), PER_STUDENT);
            for (i, grade) in grades.iter().enumerate() {
                assert_eq!(grade.student_id, student_id);
                assert_eq!(grade.discipline_code, format!("D{i}"));
            }
        }
    }
}
