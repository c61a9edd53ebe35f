//! Typed domain operations for the Libris digital library backend.
//!
//! [`LibraryApi`] binds every endpoint family (auth, courses, books,
//! e-books, notes, question papers, notices, users, circulation and
//! documents) to a named method. Payloads are decoded once, here, into the
//! types in [`models`]; a server envelope with `status: false` surfaces as
//! [`Error::Rejected`].
//!
//! Transport, caching, request de-duplication and the interceptor chain
//! live in `libris_http`; [`LibraryApi::with_transport`] wires them
//! together with the standard interceptors installed.
//!
//! [`NocFlow`] implements the library-clearance flow, which refuses to
//! collect certificate details while a student still holds books.

pub mod endpoints;
mod error;
mod facade;
pub mod models;
mod noc;

pub use error::{Error, Result};
pub use facade::LibraryApi;
pub use models::{
    Book, Course, Document, Ebook, Envelope, IssuedBook, LoginResponse, NocDetails, NocDocument,
    NocRecord, NocRequest, Note, Notice, Paginated, QuestionPaper, Resources, StudentLookup, User,
};
pub use noc::{NocFlow, NocStage, ineligibility_message, outstanding_books};
