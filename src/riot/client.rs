use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use super::error::{parse_retry_after, RiotError};
use super::models::{
    AccountDto, CurrentGameInfo, LeagueEntryDto, LeagueListDto, MatchDto, SummonerDto,
};
use super::rate_limit::RateLimiter;
use super::routing::{Platform, Regional};
use super::{MatchIdsQuery, RiotApi, RANKED_SOLO_QUEUE};
use crate::normalization::{Division, Tier};
use crate::util::env::{env_opt, env_parse, env_req};

#[derive(Debug, Clone)]
pub struct RiotConfig {
    pub api_key: String,
    /// Overrides `https://{host}.api.riotgames.com` for every host (local proxy, tests).
    pub base_url: Option<String>,
    pub timeout: Duration,
    pub user_agent: String,
}

impl RiotConfig {
    pub fn from_env() -> Result<Self> {
        let api_key = env_req("RIOT_API_KEY").context("RIOT_API_KEY is required")?;
        let base_url = match env_opt("RIOT_BASE_URL") {
            Some(raw) => {
                let parsed = url::Url::parse(raw.trim()).context("invalid RIOT_BASE_URL")?;
                Some(parsed.as_str().trim_end_matches('/').to_string())
            }
            None => None,
        };
        Ok(Self {
            api_key,
            base_url,
            timeout: Duration::from_secs(env_parse("RIOT_TIMEOUT_SECS", 10u64)),
            user_agent: env_opt("RIOT_USER_AGENT")
                .unwrap_or_else(|| format!("riftstats/{}", env!("CARGO_PKG_VERSION"))),
        })
    }
}

pub struct RiotClient {
    cfg: RiotConfig,
    http: Client,
    limiter: Arc<RateLimiter>,
}

impl RiotClient {
    pub fn new(cfg: RiotConfig, limiter: Arc<RateLimiter>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.timeout)
            .build()
            .context("failed to construct riot HTTP client")?;
        Ok(Self { cfg, http, limiter })
    }

    pub fn shared_limiter(&self) -> Arc<RateLimiter> {
        self.limiter.clone()
    }

    fn host_url(&self, host: &str) -> String {
        match &self.cfg.base_url {
            Some(base) => base.clone(),
            None => format!("https://{host}.api.riotgames.com"),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, RiotError> {
        self.limiter.wait_for_request().await;
        let resp = self
            .http
            .get(&url)
            .header("X-Riot-Token", &self.cfg.api_key)
            .send()
            .await?;
        let status = resp.status();
        debug!(%url, status = status.as_u16(), "riot api response");

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = parse_retry_after(
                resp.headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok()),
            );
            return Err(RiotError::RateLimited { retry_after });
        }
        if status == StatusCode::NOT_FOUND {
            return Err(RiotError::NotFound(url));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RiotError::Status { status, body });
        }
        let text = resp.text().await?;
        serde_json::from_str(&text).map_err(|source| RiotError::Decode { url, source })
    }
}

#[async_trait]
impl RiotApi for RiotClient {
    fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    #[instrument(skip(self))]
    async fn league_entries(
        &self,
        platform: Platform,
        tier: Tier,
        division: Division,
        page: u32,
    ) -> Result<Vec<LeagueEntryDto>, RiotError> {
        let url = format!(
            "{}/lol/league/v4/entries/{}/{}/{}?page={}",
            self.host_url(platform.as_str()),
            RANKED_SOLO_QUEUE,
            tier.as_api_str(),
            division.as_api_str(),
            page.max(1)
        );
        self.get_json(url).await
    }

    #[instrument(skip(self))]
    async fn apex_league(&self, platform: Platform, tier: Tier) -> Result<LeagueListDto, RiotError> {
        let league = match tier {
            Tier::Challenger => "challengerleagues",
            Tier::Grandmaster => "grandmasterleagues",
            _ => "masterleagues",
        };
        let url = format!(
            "{}/lol/league/v4/{}/by-queue/{}",
            self.host_url(platform.as_str()),
            league,
            RANKED_SOLO_QUEUE
        );
        self.get_json(url).await
    }

    #[instrument(skip(self))]
    async fn summoner_by_id(
        &self,
        platform: Platform,
        summoner_id: &str,
    ) -> Result<SummonerDto, RiotError> {
        let url = format!(
            "{}/lol/summoner/v4/summoners/{}",
            self.host_url(platform.as_str()),
            urlencoding::encode(summoner_id)
        );
        self.get_json(url).await
    }

    #[instrument(skip(self))]
    async fn summoner_by_puuid(
        &self,
        platform: Platform,
        puuid: &str,
    ) -> Result<SummonerDto, RiotError> {
        let url = format!(
            "{}/lol/summoner/v4/summoners/by-puuid/{}",
            self.host_url(platform.as_str()),
            urlencoding::encode(puuid)
        );
        self.get_json(url).await
    }

    #[instrument(skip(self))]
    async fn account_by_riot_id(
        &self,
        regional: Regional,
        game_name: &str,
        tag_line: &str,
    ) -> Result<AccountDto, RiotError> {
        let url = format!(
            "{}/riot/account/v1/accounts/by-riot-id/{}/{}",
            self.host_url(regional.as_str()),
            urlencoding::encode(game_name),
            urlencoding::encode(tag_line)
        );
        self.get_json(url).await
    }

    #[instrument(skip(self))]
    async fn match_ids_by_puuid(
        &self,
        regional: Regional,
        puuid: &str,
        query: MatchIdsQuery,
    ) -> Result<Vec<String>, RiotError> {
        let mut url = format!(
            "{}/lol/match/v5/matches/by-puuid/{}/ids?start={}&count={}",
            self.host_url(regional.as_str()),
            urlencoding::encode(puuid),
            query.start,
            query.count.clamp(1, 100)
        );
        if let Some(queue) = query.queue {
            url.push_str(&format!("&queue={queue}"));
        }
        self.get_json(url).await
    }

    #[instrument(skip(self))]
    async fn match_by_id(&self, regional: Regional, match_id: &str) -> Result<MatchDto, RiotError> {
        let url = format!(
            "{}/lol/match/v5/matches/{}",
            self.host_url(regional.as_str()),
            urlencoding::encode(match_id)
        );
        self.get_json(url).await
    }

    #[instrument(skip(self))]
    async fn active_game(
        &self,
        platform: Platform,
        puuid: &str,
    ) -> Result<Option<CurrentGameInfo>, RiotError> {
        let url = format!(
            "{}/lol/spectator/v5/active-games/by-summoner/{}",
            self.host_url(platform.as_str()),
            urlencoding::encode(puuid)
        );
        match self.get_json(url).await {
            Ok(game) => Ok(Some(game)),
            Err(RiotError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::riot::rate_limit::RateLimitConfig;

    fn client(base_url: Option<&str>) -> RiotClient {
        let cfg = RiotConfig {
            api_key: "RGAPI-test".into(),
            base_url: base_url.map(str::to_string),
            timeout: Duration::from_secs(1),
            user_agent: "riftstats-test".into(),
        };
        RiotClient::new(cfg, Arc::new(RateLimiter::new(RateLimitConfig::default()))).unwrap()
    }

    #[test]
    fn hosts_follow_routing_values() {
        let c = client(None);
        assert_eq!(c.host_url("euw1"), "https://euw1.api.riotgames.com");
        assert_eq!(
            c.host_url(Regional::Europe.as_str()),
            "https://europe.api.riotgames.com"
        );
    }

    #[test]
    fn base_url_override_applies_to_every_host() {
        let c = client(Some("http://127.0.0.1:8089"));
        assert_eq!(c.host_url("na1"), "http://127.0.0.1:8089");
        assert_eq!(c.host_url("americas"), "http://127.0.0.1:8089");
    }
}
