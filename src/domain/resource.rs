use crate::domain::errors::ApiError;
use crate::domain::request::ApiRequest;
use std::fmt;
use std::str::FromStr;

/// Resource collections exposed by the VAPI REST API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Assistants,
    Calls,
    PhoneNumbers,
    Squads,
    Tools,
    Files,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::Assistants,
        ResourceKind::Calls,
        ResourceKind::PhoneNumbers,
        ResourceKind::Squads,
        ResourceKind::Tools,
        ResourceKind::Files,
    ];

    /// Collection path relative to the API base URL.
    pub fn path(&self) -> &'static str {
        match self {
            ResourceKind::Assistants => "/assistant",
            ResourceKind::Calls => "/call",
            ResourceKind::PhoneNumbers => "/phone-number",
            ResourceKind::Squads => "/squad",
            ResourceKind::Tools => "/tool",
            ResourceKind::Files => "/file",
        }
    }

    /// Key used for this kind in fan-out result maps.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Assistants => "assistants",
            ResourceKind::Calls => "calls",
            ResourceKind::PhoneNumbers => "phoneNumbers",
            ResourceKind::Squads => "squads",
            ResourceKind::Tools => "tools",
            ResourceKind::Files => "files",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "assistants" | "assistant" => Ok(ResourceKind::Assistants),
            "calls" | "call" => Ok(ResourceKind::Calls),
            "phonenumbers" | "phone-numbers" | "phone_numbers" | "phone-number" => {
                Ok(ResourceKind::PhoneNumbers)
            }
            "squads" | "squad" => Ok(ResourceKind::Squads),
            "tools" | "tool" => Ok(ResourceKind::Tools),
            "files" | "file" => Ok(ResourceKind::Files),
            _ => Err(ApiError::UnknownResource {
                kind: s.to_string(),
            }),
        }
    }
}

/// `limit`/`offset` pagination for list endpoints
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListParams {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ListParams {
    pub fn limit(limit: u32) -> Self {
        Self {
            limit: Some(limit),
            offset: None,
        }
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn to_request(self, kind: ResourceKind) -> ApiRequest {
        let mut request = ApiRequest::get(kind.path());
        if let Some(limit) = self.limit {
            request = request.with_query("limit", limit);
        }
        if let Some(offset) = self.offset {
            request = request.with_query("offset", offset);
        }
        request
    }
}
