//! Library clearance (NOC) generation, gated on circulation history.
//!
//! A certificate may only be generated for a student with no outstanding
//! books. [`NocFlow`] walks the stages explicitly:
//!
//! ```text
//! Start --check--> Ineligible { outstanding, message }
//!              \-> CollectingDetails { student } --submit--> Generated { document }
//! ```

use libris_http::Transport;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::facade::LibraryApi;
use crate::models::{IssuedBook, NocDetails, NocDocument, NocRequest, StudentLookup, User};

/// The books in `issued` that have not been returned.
pub fn outstanding_books(issued: &[IssuedBook]) -> Vec<IssuedBook> {
    issued
        .iter()
        .filter(|book| book.is_outstanding())
        .cloned()
        .collect()
}

/// Why a student is refused a certificate, naming every outstanding book.
pub fn ineligibility_message(outstanding: &[IssuedBook]) -> String {
    let titles = outstanding
        .iter()
        .map(IssuedBook::display_title)
        .collect::<Vec<_>>()
        .join(", ");
    let noun = if outstanding.len() == 1 { "book" } else { "books" };
    format!(
        "Student has {} outstanding {noun}: {titles}. Return them before requesting a NOC.",
        outstanding.len()
    )
}

#[derive(Debug, Clone, PartialEq)]
pub enum NocStage {
    Start,
    Ineligible {
        outstanding: Vec<IssuedBook>,
        message: String,
    },
    CollectingDetails {
        student: User,
    },
    Generated {
        document: NocDocument,
    },
}

impl NocStage {
    pub fn name(&self) -> &'static str {
        match self {
            NocStage::Start => "not started",
            NocStage::Ineligible { .. } => "ineligible",
            NocStage::CollectingDetails { .. } => "collecting details",
            NocStage::Generated { .. } => "generated",
        }
    }
}

/// One clearance request against a [`LibraryApi`].
#[derive(Debug)]
pub struct NocFlow<'a, T> {
    api: &'a LibraryApi<T>,
    library_id: Option<String>,
    stage: NocStage,
}

impl<'a, T: Transport> NocFlow<'a, T> {
    pub fn new(api: &'a LibraryApi<T>) -> Self {
        Self {
            api,
            library_id: None,
            stage: NocStage::Start,
        }
    }

    pub fn stage(&self) -> &NocStage {
        &self.stage
    }

    /// Look the student up and decide eligibility. Restarts the flow.
    pub async fn check(&mut self, library_id: &str) -> Result<&NocStage> {
        self.stage = NocStage::Start;
        self.library_id = None;

        let (student, issued) = match self.api.find_student(library_id).await? {
            StudentLookup::NotFound => return Err(Error::StudentNotFound(library_id.to_string())),
            StudentLookup::WithCirculation {
                student,
                issued_books,
            } => (student, issued_books),
            StudentLookup::StudentOnly(student) => {
                let issued = self.api.get_issued_books(library_id).await?;
                (student, issued)
            }
        };

        let outstanding = outstanding_books(&issued);
        self.library_id = Some(library_id.to_string());
        self.stage = if outstanding.is_empty() {
            debug!(library_id, student = student.id, "student is eligible for a NOC");
            NocStage::CollectingDetails { student }
        } else {
            let message = ineligibility_message(&outstanding);
            info!(library_id, outstanding = outstanding.len(), "NOC refused");
            NocStage::Ineligible {
                outstanding,
                message,
            }
        };
        Ok(&self.stage)
    }

    /// Generate the certificate. Only valid while collecting details.
    pub async fn submit(&mut self, details: NocDetails) -> Result<NocDocument> {
        let NocStage::CollectingDetails { student } = &self.stage else {
            return Err(Error::InvalidStage {
                action: "submit details",
                stage: self.stage.name(),
            });
        };

        let library_id = student
            .library_id
            .clone()
            .or_else(|| self.library_id.clone())
            .unwrap_or_default();
        let request = NocRequest {
            library_id,
            user_id: student.id,
            details,
        };
        let document = self.api.generate_noc(&request).await?;
        info!(library_id = %request.library_id, "NOC generated");
        self.stage = NocStage::Generated {
            document: document.clone(),
        };
        Ok(document)
    }

    /// Check then submit in one call, failing with [`Error::NotEligible`] at the gate.
    pub async fn run(mut self, library_id: &str, details: NocDetails) -> Result<NocDocument> {
        if let NocStage::Ineligible { message, .. } = self.check(library_id).await? {
            return Err(Error::NotEligible(message.clone()));
        }
        self.submit(details).await
    }
}
