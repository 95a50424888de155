use std::{borrow::Cow, time::Duration};

use {
    async_trait::async_trait,
    pocmon_rotation::{Channel, MemberProfile, MembershipProvider, Notifier, Presence},
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, de::{DeserializeOwned, IgnoredAny}},
    serde_json::{Value, json},
    tracing::debug,
};

use crate::{Error, Result};

/// Page size for cursor-paginated methods.
const PAGE_LIMIT: &str = "200";

#[derive(Debug, Default, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

fn next_cursor(meta: Option<ResponseMetadata>) -> Option<String> {
    meta.map(|m| m.next_cursor).filter(|c| !c.is_empty())
}

#[derive(Debug, Deserialize)]
struct ConversationList {
    channels: Vec<Conversation>,
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct Conversation {
    id: String,
    name: String,
    #[serde(default)]
    is_member: bool,
    topic: Option<Topic>,
}

#[derive(Debug, Deserialize)]
struct Topic {
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct MemberList {
    members: Vec<String>,
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    user: User,
}

#[derive(Debug, Deserialize)]
struct User {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct PresenceInfo {
    presence: String,
}

#[derive(Debug, Deserialize)]
struct OpenedConversation {
    channel: ConversationId,
}

#[derive(Debug, Deserialize)]
struct ConversationId {
    id: String,
}

fn is_id_with_prefix(target: &str, prefixes: &[char]) -> bool {
    target.len() > 1
        && target.starts_with(prefixes)
        && target
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

/// `U…`/`W…` member ids get a DM opened before posting.
fn is_user_id(target: &str) -> bool {
    is_id_with_prefix(target, &['U', 'W'])
}

fn is_conversation_id(target: &str) -> bool {
    is_id_with_prefix(target, &['C', 'G', 'D'])
}

/// Channel names are posted to as `#name`; ids pass through.
fn channel_ref(target: &str) -> Cow<'_, str> {
    if is_conversation_id(target) || target.starts_with('#') {
        Cow::Borrowed(target)
    } else {
        Cow::Owned(format!("#{target}"))
    }
}

/// Slack Web API client authenticated with a bot token.
pub struct SlackClient {
    http: reqwest::Client,
    token: Secret<String>,
    api_base: String,
}

impl std::fmt::Debug for SlackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackClient")
            .field("token", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl SlackClient {
    pub fn new(token: Secret<String>, api_base: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::http("client", e))?;
        Ok(Self {
            http,
            token,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{method}", self.api_base)
    }

    async fn get<T: DeserializeOwned>(&self, method: &'static str, query: &[(&str, &str)]) -> Result<T> {
        debug!(method, "slack api call");
        let resp = self
            .http
            .get(self.url(method))
            .bearer_auth(self.token.expose_secret())
            .query(query)
            .send()
            .await
            .map_err(|e| Error::http(method, e))?;
        decode(method, resp).await
    }

    async fn post<T: DeserializeOwned>(&self, method: &'static str, body: &Value) -> Result<T> {
        debug!(method, "slack api call");
        let resp = self
            .http
            .post(self.url(method))
            .bearer_auth(self.token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| Error::http(method, e))?;
        decode(method, resp).await
    }

    /// Public and private, non-archived conversations visible to the bot.
    async fn conversations(&self) -> Result<Vec<Conversation>> {
        let mut all = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page: ConversationList = {
                let mut query = vec![
                    ("types", "public_channel,private_channel"),
                    ("exclude_archived", "true"),
                    ("limit", PAGE_LIMIT),
                ];
                if let Some(c) = cursor.as_deref() {
                    query.push(("cursor", c));
                }
                self.get("conversations.list", &query).await?
            };
            all.extend(page.channels);
            match next_cursor(page.response_metadata) {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(all)
    }

    async fn channel_members(&self, channel_id: &str) -> Result<Vec<String>> {
        let mut all = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page: MemberList = {
                let mut query = vec![("channel", channel_id), ("limit", PAGE_LIMIT)];
                if let Some(c) = cursor.as_deref() {
                    query.push(("cursor", c));
                }
                self.get("conversations.members", &query).await?
            };
            all.extend(page.members);
            match next_cursor(page.response_metadata) {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(all)
    }

    async fn open_direct(&self, user_id: &str) -> Result<String> {
        let opened: OpenedConversation = self
            .post("conversations.open", &json!({ "users": user_id }))
            .await?;
        Ok(opened.channel.id)
    }
}

/// Check the HTTP status and Slack's `ok` flag, then decode the body.
async fn decode<T: DeserializeOwned>(method: &'static str, resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Status {
            method,
            status: status.as_u16(),
            body,
        });
    }

    let value: Value = resp.json().await.map_err(|e| Error::http(method, e))?;
    if !value.get("ok").and_then(Value::as_bool).unwrap_or(false) {
        let error = value
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown_error");
        return Err(Error::api(method, error));
    }
    serde_json::from_value(value).map_err(|source| Error::Decode { method, source })
}

#[async_trait]
impl MembershipProvider for SlackClient {
    /// Member ids are only fetched for channels the bot belongs to; the
    /// others come back with an empty member list.
    async fn list_channels(&self) -> anyhow::Result<Vec<Channel>> {
        let conversations = self.conversations().await?;
        let mut channels = Vec::with_capacity(conversations.len());
        for c in conversations {
            let member_ids = if c.is_member {
                self.channel_members(&c.id).await?
            } else {
                Vec::new()
            };
            channels.push(Channel {
                id: c.id,
                name: c.name,
                topic: c.topic.map(|t| t.value).unwrap_or_default(),
                member_ids,
                is_member: c.is_member,
            });
        }
        debug!(count = channels.len(), "listed slack channels");
        Ok(channels)
    }

    async fn get_member(&self, member_id: &str) -> anyhow::Result<MemberProfile> {
        let info: UserInfo = self.get("users.info", &[("user", member_id)]).await?;
        Ok(MemberProfile {
            id: info.user.id,
            name: info.user.name,
        })
    }

    async fn get_presence(&self, member_id: &str) -> anyhow::Result<Presence> {
        let info: PresenceInfo = self
            .get("users.getPresence", &[("user", member_id)])
            .await?;
        Ok(if info.presence == "active" {
            Presence::Active
        } else {
            Presence::Inactive
        })
    }
}

#[async_trait]
impl Notifier for SlackClient {
    async fn set_topic(&self, channel_id: &str, topic: &str) -> anyhow::Result<()> {
        let _: IgnoredAny = self
            .post(
                "conversations.setTopic",
                &json!({ "channel": channel_id, "topic": topic }),
            )
            .await?;
        Ok(())
    }

    async fn post_message(&self, target: &str, text: &str) -> anyhow::Result<()> {
        let channel = if is_user_id(target) {
            Cow::Owned(self.open_direct(target).await?)
        } else {
            channel_ref(target)
        };
        let _: IgnoredAny = self
            .post(
                "chat.postMessage",
                &json!({ "channel": channel, "text": text }),
            )
            .await?;
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, mockito::Matcher};

    fn client(server: &mockito::Server) -> SlackClient {
        SlackClient::new(
            Secret::new("xoxb-test".into()),
            server.url(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn target_classification() {
        assert!(is_user_id("U024BE7LH"));
        assert!(is_user_id("W123ABC"));
        assert!(!is_user_id("ops"));
        assert!(!is_user_id("C024BE91L"));
        assert_eq!(channel_ref("ops"), "#ops");
        assert_eq!(channel_ref("#ops"), "#ops");
        assert_eq!(channel_ref("C024BE91L"), "C024BE91L");
    }

    #[test]
    fn debug_redacts_token() {
        let c = SlackClient::new(
            Secret::new("xoxb-secret".into()),
            "https://slack.com/api/",
            Duration::from_secs(1),
        )
        .unwrap();
        let debug = format!("{c:?}");
        assert!(!debug.contains("xoxb-secret"));
        assert!(debug.contains("https://slack.com/api\""));
    }

    #[tokio::test]
    async fn list_channels_paginates_and_maps() {
        let mut server = mockito::Server::new_async().await;
        let page1 = server
            .mock("GET", "/conversations.list")
            .match_header("authorization", "Bearer xoxb-test")
            .match_query(Matcher::Exact(
                "types=public_channel%2Cprivate_channel&exclude_archived=true&limit=200".into(),
            ))
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "ok": true,
                    "channels": [
                        {"id": "C1", "name": "ops", "is_member": true, "topic": {"value": "deploys"}}
                    ],
                    "response_metadata": {"next_cursor": "p2"}
                })
                .to_string(),
            )
            .create_async()
            .await;
        let page2 = server
            .mock("GET", "/conversations.list")
            .match_query(Matcher::UrlEncoded("cursor".into(), "p2".into()))
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "ok": true,
                    "channels": [{"id": "C2", "name": "random", "is_member": false}],
                    "response_metadata": {"next_cursor": ""}
                })
                .to_string(),
            )
            .create_async()
            .await;
        let members1 = server
            .mock("GET", "/conversations.members")
            .match_query(Matcher::Exact("channel=C1&limit=200".into()))
            .with_body(
                json!({
                    "ok": true,
                    "members": ["U1", "U2"],
                    "response_metadata": {"next_cursor": "m2"}
                })
                .to_string(),
            )
            .create_async()
            .await;
        let members2 = server
            .mock("GET", "/conversations.members")
            .match_query(Matcher::UrlEncoded("cursor".into(), "m2".into()))
            .with_body(json!({"ok": true, "members": ["U3"]}).to_string())
            .create_async()
            .await;

        let channels = client(&server).list_channels().await.unwrap();

        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0], Channel {
            id: "C1".into(),
            name: "ops".into(),
            topic: "deploys".into(),
            member_ids: vec!["U1".into(), "U2".into(), "U3".into()],
            is_member: true,
        });
        assert!(!channels[1].is_member);
        assert!(channels[1].member_ids.is_empty());
        assert!(channels[1].topic.is_empty());

        page1.assert_async().await;
        page2.assert_async().await;
        members1.assert_async().await;
        members2.assert_async().await;
    }

    #[tokio::test]
    async fn member_and_presence() {
        let mut server = mockito::Server::new_async().await;
        let _info = server
            .mock("GET", "/users.info")
            .match_query(Matcher::UrlEncoded("user".into(), "U1".into()))
            .with_body(json!({"ok": true, "user": {"id": "U1", "name": "alice"}}).to_string())
            .create_async()
            .await;
        let _active = server
            .mock("GET", "/users.getPresence")
            .match_query(Matcher::UrlEncoded("user".into(), "U1".into()))
            .with_body(json!({"ok": true, "presence": "active"}).to_string())
            .create_async()
            .await;
        let _away = server
            .mock("GET", "/users.getPresence")
            .match_query(Matcher::UrlEncoded("user".into(), "U2".into()))
            .with_body(json!({"ok": true, "presence": "away"}).to_string())
            .create_async()
            .await;

        let c = client(&server);
        assert_eq!(c.get_member("U1").await.unwrap(), MemberProfile {
            id: "U1".into(),
            name: "alice".into(),
        });
        assert_eq!(c.get_presence("U1").await.unwrap(), Presence::Active);
        assert_eq!(c.get_presence("U2").await.unwrap(), Presence::Inactive);
    }

    #[tokio::test]
    async fn api_errors_carry_slack_code() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/users.info")
            .match_query(Matcher::Any)
            .with_body(json!({"ok": false, "error": "user_not_found"}).to_string())
            .create_async()
            .await;

        let err = client(&server).get_member("U9").await.unwrap_err();
        let slack = err.downcast_ref::<Error>().unwrap();
        assert_eq!(slack.api_error(), Some("user_not_found"));
        assert_eq!(err.to_string(), "slack users.info failed: user_not_found");
    }

    #[tokio::test]
    async fn http_errors_are_reported() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/conversations.setTopic")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let err = client(&server).set_topic("C1", "POC: alice").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::Status { status: 500, .. })
        ));
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn set_topic_sends_channel_and_topic() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/conversations.setTopic")
            .match_header("authorization", "Bearer xoxb-test")
            .match_body(Matcher::Json(json!({"channel": "C1", "topic": "deploys | POC: alice"})))
            .with_body(json!({"ok": true, "channel": {"id": "C1"}}).to_string())
            .create_async()
            .await;

        client(&server)
            .set_topic("C1", "deploys | POC: alice")
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn post_to_channel_name() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat.postMessage")
            .match_body(Matcher::Json(json!({"channel": "#ops", "text": "alice is now the POC"})))
            .with_body(json!({"ok": true, "ts": "1.2"}).to_string())
            .create_async()
            .await;

        client(&server)
            .post_message("ops", "alice is now the POC")
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn post_to_member_opens_dm() {
        let mut server = mockito::Server::new_async().await;
        let open = server
            .mock("POST", "/conversations.open")
            .match_body(Matcher::Json(json!({"users": "U1"})))
            .with_body(json!({"ok": true, "channel": {"id": "D42"}}).to_string())
            .create_async()
            .await;
        let post = server
            .mock("POST", "/chat.postMessage")
            .match_body(Matcher::Json(json!({"channel": "D42", "text": "you're up"})))
            .with_body(json!({"ok": true}).to_string())
            .create_async()
            .await;

        client(&server).post_message("U1", "you're up").await.unwrap();
        open.assert_async().await;
        post.assert_async().await;
    }
}
