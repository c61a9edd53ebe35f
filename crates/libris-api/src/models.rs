//! Typed shapes of the backend's JSON documents.
//!
//! Payloads are validated once, here, so callers never re-inspect untyped
//! values.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

fn default_true() -> bool {
    true
}

/// `{ status, message?, data? }`, the backend's standard reply.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Envelope<T> {
    #[serde(default = "default_true")]
    pub status: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoginResponse {
    #[serde(default = "default_true")]
    pub status: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub token: String,
    pub user: User,
}

/// One page of a listing; a bare array decodes as a single page.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "PageRepr<T>", bound(deserialize = "T: Deserialize<'de>"))]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub current_page: u32,
    pub last_page: u32,
    pub per_page: Option<u32>,
    pub total: Option<u64>,
}

impl<T> Paginated<T> {
    pub fn has_next(&self) -> bool {
        self.current_page < self.last_page
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PageRepr<T> {
    Page {
        data: Vec<T>,
        #[serde(default)]
        current_page: Option<u32>,
        #[serde(default)]
        last_page: Option<u32>,
        #[serde(default)]
        per_page: Option<u32>,
        #[serde(default)]
        total: Option<u64>,
    },
    List(Vec<T>),
}

impl<T> From<PageRepr<T>> for Paginated<T> {
    fn from(repr: PageRepr<T>) -> Self {
        match repr {
            PageRepr::Page {
                data,
                current_page,
                last_page,
                per_page,
                total,
            } => {
                let current_page = current_page.unwrap_or(1);
                Paginated {
                    data,
                    current_page,
                    last_page: last_page.unwrap_or(current_page),
                    per_page,
                    total,
                }
            }
            PageRepr::List(data) => Paginated {
                total: Some(data.len() as u64),
                data,
                current_page: 1,
                last_page: 1,
                per_page: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub library_id: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: u64,
    #[serde(alias = "course_name")]
    pub name: String,
    #[serde(default, alias = "course_code")]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default, alias = "available_quantity")]
    pub available: Option<u32>,
}

/// A downloadable course document (e-book, note or question paper).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub course_id: Option<u64>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default, alias = "file_path")]
    pub file_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

pub type Ebook = Document;
pub type Note = Document;
pub type QuestionPaper = Document;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub notification_type: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub user_id: Option<u64>,
    #[serde(default)]
    pub attachment: Option<String>,
}

/// The aggregate `/resources` listing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Resources {
    pub ebooks: Vec<Ebook>,
    pub notes: Vec<Note>,
    #[serde(alias = "oldquestions", alias = "old_questions")]
    pub question_papers: Vec<QuestionPaper>,
}

/// One circulation record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuedBook {
    pub id: u64,
    #[serde(default)]
    pub book_id: Option<u64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub book: Option<Book>,
    #[serde(default, alias = "issue_date")]
    pub issued_at: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default, alias = "return_date")]
    pub returned_at: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub fine: Option<f64>,
}

impl IssuedBook {
    /// Not returned: no return timestamp and not marked `returned`.
    pub fn is_outstanding(&self) -> bool {
        let marked_returned = self
            .status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("returned"));
        self.returned_at.is_none() && !marked_returned
    }

    pub fn display_title(&self) -> String {
        self.title
            .clone()
            .or_else(|| self.book.as_ref().map(|b| b.title.clone()))
            .or_else(|| self.book_id.map(|id| format!("Book #{id}")))
            .unwrap_or_else(|| format!("Issue #{}", self.id))
    }
}

/// What a library-ID search found.
#[derive(Debug, Clone, PartialEq)]
pub enum StudentLookup {
    /// The student together with their circulation history.
    WithCirculation {
        student: User,
        issued_books: Vec<IssuedBook>,
    },
    StudentOnly(User),
    NotFound,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LookupRepr {
    Nested {
        user: User,
        #[serde(default)]
        issued_books: Vec<IssuedBook>,
    },
    Flat(User),
}

impl StudentLookup {
    /// Classify the `data` member of a search reply.
    pub fn from_data(data: Option<Value>) -> serde_json::Result<Self> {
        let Some(data) = data.filter(|v| !v.is_null()) else {
            return Ok(StudentLookup::NotFound);
        };
        Ok(match serde_json::from_value(data)? {
            LookupRepr::Nested { user, issued_books } => StudentLookup::WithCirculation {
                student: user,
                issued_books,
            },
            LookupRepr::Flat(user) => StudentLookup::StudentOnly(user),
        })
    }

    pub fn student(&self) -> Option<&User> {
        match self {
            StudentLookup::WithCirculation { student, .. } => Some(student),
            StudentLookup::StudentOnly(student) => Some(student),
            StudentLookup::NotFound => None,
        }
    }
}

/// Issued-books listings come either bare or wrapped.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum IssuedBooksRepr {
    List(Vec<IssuedBook>),
    Wrapped { issued_books: Vec<IssuedBook> },
}

impl From<IssuedBooksRepr> for Vec<IssuedBook> {
    fn from(repr: IssuedBooksRepr) -> Self {
        match repr {
            IssuedBooksRepr::List(books) | IssuedBooksRepr::Wrapped { issued_books: books } => {
                books
            }
        }
    }
}

/// Details collected before a clearance certificate is generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NocDetails {
    pub reason: String,
    pub remarks: String,
    /// Requested certificate date, `YYYY-MM-DD`.
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NocRequest {
    pub library_id: String,
    pub user_id: u64,
    #[serde(flatten)]
    pub details: NocDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct NocRecord {
    pub certificate_number: Option<String>,
    pub student_name: Option<String>,
    pub library_id: Option<String>,
    pub issued_at: Option<String>,
    pub download_url: Option<String>,
}

/// A generated clearance certificate.
#[derive(Debug, Clone, PartialEq)]
pub enum NocDocument {
    Pdf(Bytes),
    Record(NocRecord),
}
