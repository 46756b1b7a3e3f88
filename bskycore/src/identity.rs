use crate::ids::{Did, DidError};
use bskyproto::atproto::DidDocument;
use thiserror::Error;

const PDS_SERVICE_ID: &str = "#atproto_pds";
const PDS_SERVICE_TYPE: &str = "AtprotoPersonalDataServer";
const HANDLE_URI_PREFIX: &str = "at://";

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("failed to decode DID document: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("DID document has an invalid id: {0}")]
    InvalidDid(#[from] DidError),
}

/// The parts of an account identity the bridge acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub did: Did,
    pub handle: Option<String>,
    pds_endpoint: Option<String>,
}

impl Identity {
    /// The declared PDS endpoint, or an empty string if the document has none.
    pub fn pds_endpoint(&self) -> &str {
        self.pds_endpoint.as_deref().unwrap_or_default()
    }
}

/// Turns an identity document returned alongside a session into an
/// [`Identity`]. Signature checks, if any, belong to the implementation.
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, document: &serde_json::Value) -> Result<Identity, IdentityError>;
}

/// Reads the identity straight out of the document without verification.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentResolver;

impl IdentityResolver for DocumentResolver {
    fn resolve(&self, document: &serde_json::Value) -> Result<Identity, IdentityError> {
        let doc: DidDocument = serde_json::from_value(document.clone())?;
        parse_identity(&doc)
    }
}

pub fn parse_identity(doc: &DidDocument) -> Result<Identity, IdentityError> {
    let did: Did = doc.id.parse()?;
    let handle = doc
        .also_known_as
        .iter()
        .find_map(|aka| aka.strip_prefix(HANDLE_URI_PREFIX))
        .map(str::to_string);
    let pds_endpoint = doc
        .service
        .iter()
        .find(|svc| {
            (svc.id == PDS_SERVICE_ID || svc.id == format!("{}{PDS_SERVICE_ID}", doc.id))
                && svc.kind == PDS_SERVICE_TYPE
        })
        .map(|svc| svc.service_endpoint.trim_end_matches('/').to_string())
        .filter(|endpoint| !endpoint.is_empty());

    Ok(Identity {
        did,
        handle,
        pds_endpoint,
    })
}
