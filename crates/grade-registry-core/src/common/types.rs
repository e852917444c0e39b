//! # Grade Record Types
//!
//! Domain-side representation of a grade record and the key used to locate
//! one for amendment. The registry stores [`GradeRecord`]s; the wire layer
//! speaks [`proto::Grade`] and friends. Conversions in both directions live
//! here so client and server agree on a single mapping.
//!
//! ## Record identity
//!
//! Within one student's sequence a record is located by its [`RecordKey`]:
//! `(discipline_code, year, term)`. The key is not enforced as unique on
//! insertion; see the server's duplicate policy.

use crate::proto;
use core::fmt;

/// One grade earned by one student in one discipline offering.
#[derive(Clone, Debug, PartialEq)]
pub struct GradeRecord {
    pub student_id: String,
    pub discipline_code: String,
    pub year: i32,
    pub term: i32,
    pub score: f64,
}

impl GradeRecord {
    pub fn new(
        student_id: impl Into<String>,
        discipline_code: impl Into<String>,
        year: i32,
        term: i32,
        score: f64,
    ) -> Self {
        Self {
            student_id: student_id.into(),
            discipline_code: discipline_code.into(),
            year,
            term,
            score,
        }
    }

    /// Borrowed `(discipline_code, year, term)` key of this record.
    pub fn key(&self) -> RecordKey<'_> {
        RecordKey {
            discipline_code: &self.discipline_code,
            year: self.year,
            term: self.term,
        }
    }

    pub fn matches(&self, key: &RecordKey<'_>) -> bool {
        self.key() == *key
    }
}

/// Locates a record within a single student's sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RecordKey<'a> {
    pub discipline_code: &'a str,
    pub year: i32,
    pub term: i32,
}

impl fmt::Display for RecordKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.discipline_code, self.year, self.term)
    }
}

impl From<GradeRecord> for proto::Grade {
    fn from(record: GradeRecord) -> Self {
        Self {
            student_id: record.student_id,
            discipline_code: record.discipline_code,
            year: record.year,
            term: record.term,
            score: record.score,
        }
    }
}

impl From<proto::Grade> for GradeRecord {
    fn from(grade: proto::Grade) -> Self {
        Self {
            student_id: grade.student_id,
            discipline_code: grade.discipline_code,
            year: grade.year,
            term: grade.term,
            score: grade.score,
        }
    }
}

impl From<proto::GradeRequest> for GradeRecord {
    fn from(req: proto::GradeRequest) -> Self {
        Self {
            student_id: req.student_id,
            discipline_code: req.discipline_code,
            year: req.year,
            term: req.term,
            score: req.score,
        }
    }
}
