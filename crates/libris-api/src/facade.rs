//! Named domain operations bound to endpoints and payload shapes.

use std::sync::Arc;

use libris_http::http::Method;
use libris_http::{
    ApiClient, ApiPayload, ClientConfig, ConfigResolver, FilePart, GetOptions, HttpPipeline,
    METHOD_OVERRIDE_FIELD, MutationOptions, Navigator, ProgressCallback, QueryParams,
    ReqwestTransport, Session, Transport, UploadOptions, install_standard_interceptors,
    reshape_notice_payload,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use crate::endpoints::{self, item};
use crate::error::{Error, Result};
use crate::models::{
    Book, Course, Ebook, Envelope, IssuedBook, IssuedBooksRepr, LoginResponse, NocDocument,
    NocRecord, NocRequest, Note, Notice, Paginated, QuestionPaper, Resources, StudentLookup, User,
};

const ATTACHMENT_FIELD: &str = "attachment";
const REJECTED_MESSAGE: &str = "The request was rejected by the server";

/// The library backend, one method per operation.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use libris_api::LibraryApi;
/// use libris_http::{ClientConfig, RouteTracker, Session};
///
/// # async fn run() -> libris_api::Result<()> {
/// let api = LibraryApi::connect(
///     ClientConfig::from_env()?,
///     Session::in_memory(),
///     Arc::new(RouteTracker::default()),
/// )?;
/// api.login("librarian@uni.edu", "secret").await?;
/// for course in api.get_courses().await? {
///     println!("{}", course.name);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct LibraryApi<T> {
    client: ApiClient<T>,
    session: Session,
}

impl LibraryApi<ReqwestTransport> {
    /// Build the production stack: reqwest transport, standard interceptors.
    pub fn connect(
        config: ClientConfig,
        session: Session,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        let transport = ReqwestTransport::new(config.timeout())?;
        Ok(Self::with_transport(transport, config, session, navigator))
    }
}

impl<T: Transport> LibraryApi<T> {
    pub fn new(client: ApiClient<T>, session: Session) -> Self {
        Self { client, session }
    }

    /// Wire `transport` into a pipeline with the standard interceptors.
    pub fn with_transport(
        transport: T,
        config: ClientConfig,
        session: Session,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let pipeline = HttpPipeline::new(transport, Arc::new(ConfigResolver::new(config)));
        install_standard_interceptors(&pipeline, session.clone(), navigator);
        Self::new(ApiClient::new(Arc::new(pipeline)), session)
    }

    pub fn client(&self) -> &ApiClient<T> {
        &self.client
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    // auth

    /// Sign in and persist the token and user.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        let body = json!({ "email": email, "password": password });
        let payload = self
            .client
            .post(endpoints::LOGIN, Some(&body), MutationOptions::default())
            .await?;
        // a refusal carries no token, so check the envelope first
        let reply: Envelope<Value> = payload.decode()?;
        if !reply.status {
            return Err(rejected(reply.message));
        }
        let login: LoginResponse = payload.decode()?;
        self.session
            .store_login(&login.token, &serde_json::to_value(&login.user)?)?;
        Ok(login)
    }

    pub async fn register<B: Serialize>(&self, registration: &B) -> Result<Option<User>> {
        self.post_data(endpoints::REGISTER, registration, &[]).await
    }

    /// End the session locally whatever the server answers.
    pub async fn logout(&self) -> Result<()> {
        let result = self
            .client
            .post(endpoints::LOGOUT, None, MutationOptions::default())
            .await;
        self.session.clear()?;
        self.client.clear_cache(None);
        result?;
        Ok(())
    }

    /// Returns the server's confirmation message.
    pub async fn forgot_password(&self, email: &str) -> Result<String> {
        let body = json!({ "email": email });
        self.post_message(endpoints::FORGOT_PASSWORD, &body).await
    }

    pub async fn reset_password<B: Serialize>(&self, reset: &B) -> Result<String> {
        self.post_message(endpoints::RESET_PASSWORD, reset).await
    }

    // courses

    pub async fn get_courses(&self) -> Result<Vec<Course>> {
        self.get_list(endpoints::COURSES, &QueryParams::new()).await
    }

    pub async fn create_course<B: Serialize>(&self, course: &B) -> Result<Option<Course>> {
        self.post_data(endpoints::COURSES, course, &[endpoints::COURSES]).await
    }

    pub async fn update_course<B: Serialize>(&self, id: u64, course: &B) -> Result<Option<Course>> {
        self.put_data(&item(endpoints::COURSES, id), course, &[endpoints::COURSES]).await
    }

    pub async fn delete_course(&self, id: u64) -> Result<()> {
        self.remove(&item(endpoints::COURSES, id), &[endpoints::COURSES]).await
    }

    // books

    /// A page of the catalogue, optionally filtered by `search`.
    pub async fn get_books(
        &self,
        page: Option<u32>,
        search: Option<&str>,
    ) -> Result<Paginated<Book>> {
        let params = QueryParams::new()
            .set_opt("page", page)
            .set_opt("search", search);
        let payload = self
            .client
            .get(endpoints::BOOKS, &params, GetOptions::default())
            .await?;
        required(payload)
    }

    pub async fn get_book(&self, id: u64) -> Result<Book> {
        let payload = self
            .client
            .get(&item(endpoints::BOOKS, id), &QueryParams::new(), GetOptions::default())
            .await?;
        required(payload)
    }

    pub async fn create_book<B: Serialize>(&self, book: &B) -> Result<Option<Book>> {
        self.post_data(endpoints::BOOKS, book, &[endpoints::BOOKS]).await
    }

    pub async fn update_book<B: Serialize>(&self, id: u64, book: &B) -> Result<Option<Book>> {
        self.put_data(&item(endpoints::BOOKS, id), book, &[endpoints::BOOKS]).await
    }

    pub async fn delete_book(&self, id: u64) -> Result<()> {
        self.remove(&item(endpoints::BOOKS, id), &[endpoints::BOOKS]).await
    }

    // e-books, notes and question papers

    pub async fn get_ebooks(&self) -> Result<Vec<Ebook>> {
        self.get_list(endpoints::EBOOKS, &QueryParams::new()).await
    }

    pub async fn upload_ebook<B: Serialize>(
        &self,
        fields: &B,
        file: FilePart,
        on_progress: Option<ProgressCallback>,
    ) -> Result<Option<Ebook>> {
        self.upload_document(endpoints::EBOOKS, fields, file, on_progress).await
    }

    pub async fn update_ebook<B: Serialize>(
        &self,
        id: u64,
        fields: &B,
        file: Option<FilePart>,
    ) -> Result<Option<Ebook>> {
        self.update_document(endpoints::EBOOKS, id, fields, file).await
    }

    pub async fn delete_ebook(&self, id: u64) -> Result<()> {
        self.remove(&item(endpoints::EBOOKS, id), &[endpoints::RESOURCES, endpoints::EBOOKS]).await
    }

    pub async fn get_notes(&self) -> Result<Vec<Note>> {
        self.get_list(endpoints::NOTES, &QueryParams::new()).await
    }

    pub async fn upload_note<B: Serialize>(
        &self,
        fields: &B,
        file: FilePart,
        on_progress: Option<ProgressCallback>,
    ) -> Result<Option<Note>> {
        self.upload_document(endpoints::NOTES, fields, file, on_progress).await
    }

    pub async fn update_note<B: Serialize>(
        &self,
        id: u64,
        fields: &B,
        file: Option<FilePart>,
    ) -> Result<Option<Note>> {
        self.update_document(endpoints::NOTES, id, fields, file).await
    }

    pub async fn delete_note(&self, id: u64) -> Result<()> {
        self.remove(&item(endpoints::NOTES, id), &[endpoints::RESOURCES, endpoints::NOTES]).await
    }

    pub async fn get_question_papers(&self) -> Result<Vec<QuestionPaper>> {
        self.get_list(endpoints::QUESTION_PAPERS, &QueryParams::new()).await
    }

    pub async fn upload_question_paper<B: Serialize>(
        &self,
        fields: &B,
        file: FilePart,
        on_progress: Option<ProgressCallback>,
    ) -> Result<Option<QuestionPaper>> {
        self.upload_document(endpoints::QUESTION_PAPERS, fields, file, on_progress).await
    }

    pub async fn update_question_paper<B: Serialize>(
        &self,
        id: u64,
        fields: &B,
        file: Option<FilePart>,
    ) -> Result<Option<QuestionPaper>> {
        self.update_document(endpoints::QUESTION_PAPERS, id, fields, file).await
    }

    pub async fn delete_question_paper(&self, id: u64) -> Result<()> {
        self.remove(
            &item(endpoints::QUESTION_PAPERS, id),
            &[endpoints::RESOURCES, endpoints::QUESTION_PAPERS],
        )
        .await
    }

    /// Every e-book, note and question paper in one listing.
    pub async fn get_resources(&self) -> Result<Resources> {
        let payload = self
            .client
            .get(endpoints::RESOURCES, &QueryParams::new(), GetOptions::default())
            .await?;
        Ok(data::<Resources>(payload)?.unwrap_or_default())
    }

    // notices

    pub async fn get_notices(&self) -> Result<Vec<Notice>> {
        self.get_list(endpoints::NOTICES, &QueryParams::new()).await
    }

    /// The pipeline maps the body onto the backend's notice fields.
    pub async fn create_notice<B: Serialize>(&self, notice: &B) -> Result<Option<Notice>> {
        self.post_data(endpoints::NOTICES, notice, &[endpoints::NOTICES]).await
    }

    pub async fn update_notice<B: Serialize>(&self, id: u64, notice: &B) -> Result<Option<Notice>> {
        self.put_data(&item(endpoints::NOTICES, id), notice, &[endpoints::NOTICES]).await
    }

    pub async fn delete_notice(&self, id: u64) -> Result<()> {
        self.remove(&item(endpoints::NOTICES, id), &[endpoints::NOTICES]).await
    }

    /// Multipart variant of [`Self::create_notice`]; the file goes under `attachment`.
    pub async fn create_notice_with_attachment<B: Serialize>(
        &self,
        notice: &B,
        attachment: FilePart,
    ) -> Result<Option<Notice>> {
        let fields = reshape_notice_payload(&serde_json::to_value(notice)?);
        let value = self
            .client
            .upload(
                endpoints::NOTICES,
                &fields,
                Some(attachment.field(ATTACHMENT_FIELD)),
                UploadOptions::default().clear_cache(endpoints::NOTICES),
            )
            .await?;
        data(ApiPayload::Json(value))
    }

    // users and students

    pub async fn get_users(&self) -> Result<Vec<User>> {
        self.get_list(endpoints::USERS, &QueryParams::new()).await
    }

    pub async fn get_user(&self, id: u64) -> Result<User> {
        let payload = self
            .client
            .get(&item(endpoints::USER, id), &QueryParams::new(), GetOptions::default())
            .await?;
        required(payload)
    }

    pub async fn update_user<B: Serialize>(&self, id: u64, user: &B) -> Result<Option<User>> {
        self.put_data(&item(endpoints::USER, id), user, &[endpoints::USER]).await
    }

    pub async fn delete_user(&self, id: u64) -> Result<()> {
        self.remove(&item(endpoints::USER, id), &[endpoints::USER, endpoints::USERS]).await
    }

    /// Look a student up by library ID. A 404 is reported as [`StudentLookup::NotFound`].
    pub async fn find_student(&self, library_id: &str) -> Result<StudentLookup> {
        let params = QueryParams::new().set("library_id", library_id);
        let payload = match self
            .client
            .get(endpoints::STUDENT_SEARCH, &params, GetOptions::default())
            .await
        {
            Ok(payload) => payload,
            Err(e) if e.status() == Some(404) => return Ok(StudentLookup::NotFound),
            Err(e) => return Err(e.into()),
        };
        Ok(StudentLookup::from_data(data::<Value>(payload)?)?)
    }

    // circulation

    pub async fn issue_book<B: Serialize>(&self, issue: &B) -> Result<Option<IssuedBook>> {
        self.post_data(
            endpoints::ISSUE_BOOK,
            issue,
            &[endpoints::ISSUED_BOOKS, endpoints::BOOKS],
        )
        .await
    }

    pub async fn return_book<B: Serialize>(&self, ret: &B) -> Result<Option<IssuedBook>> {
        self.post_data(
            endpoints::RETURN_BOOK,
            ret,
            &[endpoints::ISSUED_BOOKS, endpoints::BOOKS],
        )
        .await
    }

    pub async fn get_issued_books(&self, library_id: &str) -> Result<Vec<IssuedBook>> {
        let params = QueryParams::new().set("library_id", library_id);
        let payload = self
            .client
            .get(endpoints::ISSUED_BOOKS, &params, GetOptions::default())
            .await?;
        Ok(data::<IssuedBooksRepr>(payload)?
            .map(Vec::from)
            .unwrap_or_default())
    }

    // documents

    /// Generate a clearance certificate; the server answers with a PDF or a record.
    pub async fn generate_noc(&self, request: &NocRequest) -> Result<NocDocument> {
        let body = serde_json::to_value(request)?;
        let payload = self
            .client
            .post(endpoints::NOC, Some(&body), MutationOptions::default())
            .await?;
        match payload {
            ApiPayload::Binary { bytes, .. } => Ok(NocDocument::Pdf(bytes)),
            other => Ok(NocDocument::Record(
                data::<NocRecord>(other)?.unwrap_or_default(),
            )),
        }
    }

    // helpers

    async fn get_list<M: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &QueryParams,
    ) -> Result<Vec<M>> {
        let payload = self
            .client
            .get(endpoint, params, GetOptions::default())
            .await?;
        Ok(data::<Vec<M>>(payload)?.unwrap_or_default())
    }

    async fn post_data<B: Serialize, M: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
        invalidate: &[&str],
    ) -> Result<Option<M>> {
        self.send_data(Method::POST, endpoint, body, invalidate).await
    }

    async fn put_data<B: Serialize, M: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
        invalidate: &[&str],
    ) -> Result<Option<M>> {
        self.send_data(Method::PUT, endpoint, body, invalidate).await
    }

    /// Invalidation follows the HTTP outcome; a reply without `data` is still a success.
    async fn send_data<B: Serialize, M: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: &B,
        invalidate: &[&str],
    ) -> Result<Option<M>> {
        let body = serde_json::to_value(body)?;
        let options = MutationOptions::default();
        let payload = if method == Method::PUT {
            self.client.put(endpoint, Some(&body), options).await?
        } else {
            self.client.post(endpoint, Some(&body), options).await?
        };
        self.invalidate(invalidate);
        data(payload)
    }

    async fn post_message<B: Serialize>(&self, endpoint: &str, body: &B) -> Result<String> {
        let body = serde_json::to_value(body)?;
        let payload = self
            .client
            .post(endpoint, Some(&body), MutationOptions::default())
            .await?;
        Ok(envelope::<Value>(payload)?.message.unwrap_or_default())
    }

    async fn remove(&self, endpoint: &str, patterns: &[&str]) -> Result<()> {
        let payload = self
            .client
            .delete(endpoint, MutationOptions::default())
            .await?;
        if payload.as_json().is_some() {
            envelope::<Value>(payload)?;
        }
        self.invalidate(patterns);
        Ok(())
    }

    async fn upload_document<B: Serialize, M: DeserializeOwned>(
        &self,
        endpoint: &str,
        fields: &B,
        file: FilePart,
        on_progress: Option<ProgressCallback>,
    ) -> Result<Option<M>> {
        let mut options = UploadOptions::default().clear_cache(endpoints::RESOURCES);
        options.on_progress = on_progress;
        let value = self
            .client
            .upload(endpoint, &serde_json::to_value(fields)?, Some(file), options)
            .await?;
        self.invalidate(&[endpoint]);
        data(ApiPayload::Json(value))
    }

    /// Multipart updates travel as POST with a `_method=PUT` field.
    async fn update_document<B: Serialize, M: DeserializeOwned>(
        &self,
        endpoint: &str,
        id: u64,
        fields: &B,
        file: Option<FilePart>,
    ) -> Result<Option<M>> {
        let mut fields = serde_json::to_value(fields)?;
        match &mut fields {
            Value::Object(map) => {
                map.insert(METHOD_OVERRIDE_FIELD.to_string(), json!(Method::PUT.as_str()));
            }
            _ => {
                return Err(libris_http::Error::InvalidRequest(
                    "upload fields must be a JSON object".to_string(),
                )
                .into());
            }
        }

        let value = self
            .client
            .upload(
                &item(endpoint, id),
                &fields,
                file,
                UploadOptions::default().clear_cache(endpoints::RESOURCES),
            )
            .await?;
        self.invalidate(&[endpoint]);
        data(ApiPayload::Json(value))
    }

    fn invalidate(&self, patterns: &[&str]) {
        for pattern in patterns {
            let removed = self.client.clear_cache(Some(pattern));
            debug!(pattern, removed, "invalidated after mutation");
        }
    }
}

fn rejected(message: Option<String>) -> Error {
    Error::Rejected {
        message: message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| REJECTED_MESSAGE.to_string()),
    }
}

/// Decode the standard envelope, turning `status: false` into [`Error::Rejected`].
fn envelope<M: DeserializeOwned>(payload: ApiPayload) -> Result<Envelope<M>> {
    let envelope: Envelope<M> = payload.decode()?;
    if !envelope.status {
        return Err(rejected(envelope.message));
    }
    Ok(envelope)
}

fn data<M: DeserializeOwned>(payload: ApiPayload) -> Result<Option<M>> {
    Ok(envelope(payload)?.data)
}

fn required<M: DeserializeOwned>(payload: ApiPayload) -> Result<M> {
    data(payload)?.ok_or(Error::MissingData)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_rejects_false_status() {
        let payload = ApiPayload::Json(json!({ "status": false, "message": "Book not available" }));
        match envelope::<Value>(payload) {
            Err(Error::Rejected { message }) => assert_eq!(message, "Book not available"),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_rejection_without_message() {
        let payload = ApiPayload::Json(json!({ "status": false }));
        let error = envelope::<Value>(payload).unwrap_err();
        assert_eq!(error.to_string(), REJECTED_MESSAGE);
    }

    #[test]
    fn test_required_data() {
        let ok = ApiPayload::Json(json!({ "status": true, "data": { "id": 1, "name": "DBMS" } }));
        let course: Course = required(ok).unwrap();
        assert_eq!(course.name, "DBMS");

        let missing = ApiPayload::Json(json!({ "status": true }));
        assert!(matches!(required::<Course>(missing), Err(Error::MissingData)));
    }

    #[test]
    fn test_empty_payload_is_missing_data() {
        assert!(matches!(required::<Course>(ApiPayload::Empty), Err(Error::Decode(_))));
    }
}
