//! Decoding of inbound messages into typed actions.
//!
//! The `action` header and the JSON body are resolved into an [`Action`]
//! once, before any business logic runs.

use serde::Deserialize;

use crate::bus::{ACTION_HEADER, Headers};
use crate::error::Failure;
use crate::persistence::RawPageId;

/// Header value for [`Action::AllPages`].
pub const ALL_PAGES: &str = "all-pages";
/// Header value for [`Action::GetPage`].
pub const GET_PAGE: &str = "get-page";
/// Header value for [`Action::CreatePage`].
pub const CREATE_PAGE: &str = "create-page";
/// Header value for [`Action::SavePage`].
pub const SAVE_PAGE: &str = "save-page";
/// Header value for [`Action::DeletePage`].
pub const DELETE_PAGE: &str = "delete-page";

/// A fully decoded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// List every page title.
    AllPages,
    /// Fetch a page by title.
    GetPage {
        /// Requested title.
        page: String,
    },
    /// Insert a new page.
    CreatePage {
        /// Page title.
        title: String,
        /// Page content.
        markdown: String,
    },
    /// Replace the content of an existing page.
    SavePage {
        /// Target page id, as received.
        id: RawPageId,
        /// New content.
        markdown: String,
    },
    /// Delete a page.
    DeletePage {
        /// Target page id, as received.
        id: RawPageId,
    },
}

#[derive(Deserialize)]
struct GetPageBody {
    page: String,
}

#[derive(Deserialize)]
struct CreatePageBody {
    title: String,
    markdown: String,
}

#[derive(Deserialize)]
struct SavePageBody {
    id: RawPageId,
    markdown: String,
}

#[derive(Deserialize)]
struct DeletePageBody {
    id: RawPageId,
}

impl Action {
    /// Decodes headers and body into an action.
    ///
    /// # Errors
    ///
    /// - `NoActionSpecified` if the `action` header is absent.
    /// - `BadAction` if the action is unknown or its body lacks a required
    ///   field.
    pub fn decode(headers: &Headers, body: &serde_json::Value) -> Result<Self, Failure> {
        let Some(action) = headers.get(ACTION_HEADER) else {
            return Err(Failure::no_action());
        };

        let bad_payload = |err: serde_json::Error| Failure::bad_payload(action, err);

        match action {
            ALL_PAGES => Ok(Self::AllPages),
            GET_PAGE => {
                let GetPageBody { page } = GetPageBody::deserialize(body).map_err(bad_payload)?;
                Ok(Self::GetPage { page })
            }
            CREATE_PAGE => {
                let CreatePageBody { title, markdown } =
                    CreatePageBody::deserialize(body).map_err(bad_payload)?;
                Ok(Self::CreatePage { title, markdown })
            }
            SAVE_PAGE => {
                let SavePageBody { id, markdown } =
                    SavePageBody::deserialize(body).map_err(bad_payload)?;
                Ok(Self::SavePage { id, markdown })
            }
            DELETE_PAGE => {
                let DeletePageBody { id } =
                    DeletePageBody::deserialize(body).map_err(bad_payload)?;
                Ok(Self::DeletePage { id })
            }
            other => Err(Failure::bad_action(other)),
        }
    }

    /// Header value naming this action.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AllPages => ALL_PAGES,
            Self::GetPage { .. } => GET_PAGE,
            Self::CreatePage { .. } => CREATE_PAGE,
            Self::SavePage { .. } => SAVE_PAGE,
            Self::DeletePage { .. } => DELETE_PAGE,
        }
    }
}
