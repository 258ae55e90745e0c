use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Standard conversion events accepted by the conversions API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventName {
    Lead,
    #[default]
    Purchase,
    CompleteRegistration,
    Contact,
    SubmitApplication,
    AddToCart,
    InitiateCheckout,
    AddPaymentInfo,
    Subscribe,
    StartTrial,
    ViewContent,
    Search,
    AddToWishlist,
    Schedule,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown event name '{0}'")]
pub struct UnknownEventName(pub String);

impl EventName {
    pub const ALL: [EventName; 14] = [
        EventName::Lead,
        EventName::Purchase,
        EventName::CompleteRegistration,
        EventName::Contact,
        EventName::SubmitApplication,
        EventName::AddToCart,
        EventName::InitiateCheckout,
        EventName::AddPaymentInfo,
        EventName::Subscribe,
        EventName::StartTrial,
        EventName::ViewContent,
        EventName::Search,
        EventName::AddToWishlist,
        EventName::Schedule,
    ];

    /// Wire value sent as `event_name`
    pub fn as_str(self) -> &'static str {
        match self {
            EventName::Lead => "Lead",
            EventName::Purchase => "Purchase",
            EventName::CompleteRegistration => "CompleteRegistration",
            EventName::Contact => "Contact",
            EventName::SubmitApplication => "SubmitApplication",
            EventName::AddToCart => "AddToCart",
            EventName::InitiateCheckout => "InitiateCheckout",
            EventName::AddPaymentInfo => "AddPaymentInfo",
            EventName::Subscribe => "Subscribe",
            EventName::StartTrial => "StartTrial",
            EventName::ViewContent => "ViewContent",
            EventName::Search => "Search",
            EventName::AddToWishlist => "AddToWishlist",
            EventName::Schedule => "Schedule",
        }
    }

    /// Human readable label for admin surfaces
    pub fn label(self) -> &'static str {
        match self {
            EventName::CompleteRegistration => "Complete Registration",
            EventName::SubmitApplication => "Submit Application",
            EventName::AddToCart => "Add to Cart",
            EventName::InitiateCheckout => "Initiate Checkout",
            EventName::AddPaymentInfo => "Add Payment Info",
            EventName::StartTrial => "Start Trial",
            EventName::ViewContent => "View Content",
            EventName::AddToWishlist => "Add to Wishlist",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventName {
    type Err = UnknownEventName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        EventName::ALL
            .into_iter()
            .find(|event| event.as_str() == trimmed)
            .ok_or_else(|| UnknownEventName(trimmed.to_string()))
    }
}

/// Site-wide tracking settings, loaded once per request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Ad account (pixel) identifier, digits only
    pub account_id: String,
    pub access_token: String,
    pub event_name: EventName,
    pub test_event_code: Option<String>,
    /// Forward order references from conversion pages
    pub ecommerce_enabled: bool,
    /// Send the visitor's IP address and user agent
    pub include_user_data: bool,
    /// Write captures and API calls to the diagnostic log
    pub debug_logging: bool,
}

impl Settings {
    /// Both the account id and the token are required before anything is relayed.
    pub fn is_complete(&self) -> bool {
        !self.account_id.is_empty() && !self.access_token.is_empty()
    }

    /// Copy of the settings that is safe to hand back to admin clients.
    pub fn masked(&self) -> SettingsView {
        SettingsView {
            account_id: self.account_id.clone(),
            access_token: mask_secret(&self.access_token),
            event_name: self.event_name,
            test_event_code: self.test_event_code.clone(),
            ecommerce_enabled: self.ecommerce_enabled,
            include_user_data: self.include_user_data,
            debug_logging: self.debug_logging,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsView {
    pub account_id: String,
    pub access_token: String,
    pub event_name: EventName,
    pub test_event_code: Option<String>,
    pub ecommerce_enabled: bool,
    pub include_user_data: bool,
    pub debug_logging: bool,
}

/// Raw settings input from the admin API or CLI.
///
/// Missing fields keep their current value; everything is sanitised in
/// [`SettingsUpdate::apply`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsUpdate {
    pub account_id: Option<String>,
    pub access_token: Option<String>,
    pub event_name: Option<String>,
    pub test_event_code: Option<String>,
    pub ecommerce_enabled: Option<bool>,
    pub include_user_data: Option<bool>,
    pub debug_logging: Option<bool>,
}

impl SettingsUpdate {
    pub fn apply(self, current: &Settings) -> Result<Settings, UnknownEventName> {
        let event_name = match self.event_name {
            Some(name) => name.parse()?,
            None => current.event_name,
        };

        let test_event_code = match self.test_event_code {
            Some(code) => Some(sanitize_text(&code)).filter(|c| !c.is_empty()),
            None => current.test_event_code.clone(),
        };

        Ok(Settings {
            account_id: self
                .account_id
                .map(|id| id.chars().filter(char::is_ascii_digit).collect())
                .unwrap_or_else(|| current.account_id.clone()),
            access_token: self
                .access_token
                .map(|token| sanitize_text(&token))
                .unwrap_or_else(|| current.access_token.clone()),
            event_name,
            test_event_code,
            ecommerce_enabled: self.ecommerce_enabled.unwrap_or(current.ecommerce_enabled),
            include_user_data: self.include_user_data.unwrap_or(current.include_user_data),
            debug_logging: self.debug_logging.unwrap_or(current.debug_logging),
        })
    }
}

/// Strip markup, control characters and surrounding whitespace from free text.
///
/// A `<` that does not open a closed tag is kept as text.
pub fn sanitize_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(ch) = rest.chars().next() {
        if ch == '<' {
            if let Some(len) = tag_len(rest) {
                rest = &rest[len..];
                continue;
            }
        }
        out.push(if ch.is_control() { ' ' } else { ch });
        rest = &rest[ch.len_utf8()..];
    }

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Byte length of the tag at the start of `s`, which begins with `<`
fn tag_len(s: &str) -> Option<usize> {
    let body = &s[1..];
    let opens_tag = body
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '/' || c == '!');
    if !opens_tag {
        return None;
    }

    let end = body.find(['<', '>'])?;
    (body.as_bytes()[end] == b'>').then_some(end + 2)
}

fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return String::new();
    }
    let count = secret.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("{}{}", "*".repeat(8), tail)
}
