pub mod catalog;
pub mod quiz_session;
pub mod session_question;
