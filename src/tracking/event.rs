use serde::Serialize;

use crate::context::RequestContext;
use crate::models::{sanitize_text, EventName, Order, Settings};

/// Events always originate from the website
pub const ACTION_SOURCE: &str = "website";
const MAX_USER_AGENT_CHARS: usize = 1000;

/// Request body for the conversions endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionPayload {
    pub data: Vec<ConversionEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_event_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionEvent {
    pub event_name: EventName,
    pub event_time: i64,
    pub action_source: &'static str,
    pub event_source_url: String,
    pub user_data: UserData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<CustomData>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserData {
    pub fbc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_user_agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomData {
    pub currency: String,
    pub value: f64,
}

/// Click identifier in the `fb.<subdomain index>.<creation time>.<click id>` format
pub fn client_id(token: &str, now: i64) -> String {
    format!("fb.1.{now}.{token}")
}

impl ConversionEvent {
    pub fn build(
        ctx: &RequestContext,
        settings: &Settings,
        click_token: &str,
        now: i64,
        order: Option<&Order>,
    ) -> Self {
        let mut user_data = UserData {
            fbc: client_id(click_token, now),
            client_ip_address: None,
            client_user_agent: None,
        };

        if settings.include_user_data {
            user_data.client_ip_address = ctx.client_ip.map(|ip| ip.to_string());
            user_data.client_user_agent = ctx
                .user_agent()
                .map(|ua| {
                    sanitize_text(ua)
                        .chars()
                        .take(MAX_USER_AGENT_CHARS)
                        .collect::<String>()
                })
                .filter(|ua| !ua.is_empty());
        }

        Self {
            event_name: settings.event_name,
            event_time: now,
            action_source: ACTION_SOURCE,
            event_source_url: ctx.full_url(),
            user_data,
            custom_data: order.map(|order| CustomData {
                currency: order.currency.clone(),
                value: order.total,
            }),
        }
    }
}

impl ConversionPayload {
    pub fn new(event: ConversionEvent, test_event_code: Option<String>) -> Self {
        Self {
            data: vec![event],
            test_event_code: test_event_code.filter(|code| !code.is_empty()),
        }
    }
}
