//! Protocol types shared by the codec and the connection.
//!
//! - `message`: payload markers produced while a request body is decoded
//!   - [`PayloadItem`]: a body chunk or the end-of-body marker
//!   - [`PayloadSize`]: how the body of a request is framed
//! - `request`: [`RequestHeader`], the parsed request line and header fields
//! - `response`: [`ResponseHead`], a response without its body, and [`is_bodiless`]
//! - `error`: [`HttpError`], [`ParseError`] and [`SendError`]

mod message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod request;
pub use request::RequestHeader;

mod response;
pub use response::ResponseHead;
pub use response::is_bodiless;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;
