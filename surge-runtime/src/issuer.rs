use rand::seq::SliceRandom;
use reqwest::header::USER_AGENT;
use surge::{IssueError, RequestIssuer, Target};
use surge_core::TargetProfile;

const DESKTOP_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
];

const MOBILE_AGENTS: &[&str] = &[
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_2 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36",
    "Mozilla/5.0 (Linux; Android 13; SM-S911B) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36",
];

/// Issues each request as an HTTP GET, posing as a browser of the target's profile.
///
/// Any 2xx response is a success. The body is read to the end so the measured latency
/// covers the whole response.
#[derive(Clone, Debug)]
pub struct HttpIssuer {
    client: reqwest::Client,
}

impl HttpIssuer {
    pub fn new() -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(reqwest::Client::builder().build()?))
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn user_agent(profile: TargetProfile) -> &'static str {
    let agents = match profile {
        TargetProfile::Desktop => DESKTOP_AGENTS,
        TargetProfile::Mobile => MOBILE_AGENTS,
    };
    agents.choose(&mut rand::thread_rng()).copied().unwrap_or_default()
}

impl RequestIssuer for HttpIssuer {
    async fn issue(&self, target: &Target) -> Result<(), IssueError> {
        let response = self
            .client
            .get(target.url.clone())
            .header(USER_AGENT, user_agent(target.profile))
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(IssueError::Status(status.as_u16()));
        }

        response.bytes().await.map_err(transport)?;
        Ok(())
    }
}

fn transport(err: reqwest::Error) -> IssueError {
    IssueError::Transport(Box::new(err))
}
