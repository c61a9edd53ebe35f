//! Backend endpoint paths, relative to the resolved base URL.

use std::fmt::Display;

pub const LOGIN: &str = "/login";
pub const REGISTER: &str = "/register";
pub const LOGOUT: &str = "/logout";
pub const FORGOT_PASSWORD: &str = "/forgot-password";
pub const RESET_PASSWORD: &str = "/reset-password";

pub const COURSES: &str = "/course";
pub const BOOKS: &str = "/books";
pub const EBOOKS: &str = "/ebooks";
pub const NOTES: &str = "/notes";
pub const QUESTION_PAPERS: &str = "/oldquestion";
pub const NOTICES: &str = "/notices";
pub const RESOURCES: &str = "/resources";

pub const USERS: &str = "/users";
pub const USER: &str = "/user";
pub const STUDENT_SEARCH: &str = "/user/search/library-id";

pub const ISSUE_BOOK: &str = "/issue-book";
pub const RETURN_BOOK: &str = "/return-book";
pub const ISSUED_BOOKS: &str = "/issued-books";

pub const NOC: &str = "/documents/noc";

/// `{collection}/{id}`.
pub fn item(collection: &str, id: impl Display) -> String {
    format!("{collection}/{id}")
}
