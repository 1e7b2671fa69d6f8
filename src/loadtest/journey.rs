//! The user journey: an ordered cycle of API steps sharing one
//! [`SessionContext`].
//!
//! The sequential journey walks
//! `Login -> ValidateToken -> LoadHome -> ClaimReward -> GameplayJoin -> UpdateScore`
//! and returns to `Login`. The login journey repeats `CredentialLogin` only.
//!
//! A step never aborts the journey. A non-200 status is recorded as
//! [`StepOutcome::Failed`], a transport error as [`StepOutcome::Transport`],
//! and a missing precondition as [`StepOutcome::Skipped`]; the next step runs
//! either way.

use std::fmt;

use reqwest::Method;
use serde_json::{json, Value};
use tracing::{error, info, info_span, warn, Instrument};

use crate::loadtest::client::{ApiClient, ApiResponse};
use crate::loadtest::config::{Credentials, GameplaySettings, JourneyKind};
use crate::loadtest::error::StepError;
use crate::loadtest::score;
use crate::loadtest::session::SessionContext;

/// One named API call of a journey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Step {
    /// Guest login with a random device id.
    Login,
    ValidateToken,
    LoadHome,
    ClaimReward,
    GameplayJoin,
    UpdateScore,
    /// Identifier/password login.
    CredentialLogin,
}

impl Step {
    /// Stable snake_case name used in logs and the summary.
    pub fn name(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::ValidateToken => "validate_token",
            Self::LoadHome => "load_home",
            Self::ClaimReward => "claim_reward",
            Self::GameplayJoin => "gameplay_join",
            Self::UpdateScore => "update_score",
            Self::CredentialLogin => "credential_login",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const SEQUENTIAL_STEPS: [Step; 6] = [
    Step::Login,
    Step::ValidateToken,
    Step::LoadHome,
    Step::ClaimReward,
    Step::GameplayJoin,
    Step::UpdateScore,
];

const LOGIN_STEPS: [Step; 1] = [Step::CredentialLogin];

impl JourneyKind {
    /// Ordered steps of one pass.
    pub fn steps(self) -> &'static [Step] {
        match self {
            Self::Sequential => &SEQUENTIAL_STEPS,
            Self::Login => &LOGIN_STEPS,
        }
    }

    /// Step every pass starts with.
    pub fn first_step(self) -> Step {
        self.steps()[0]
    }

    /// Step following `step`. The last step of a pass wraps to the first one,
    /// which is the only reset transition of the cycle.
    pub fn next_step(self, step: Step) -> Step {
        let steps = self.steps();
        steps
            .iter()
            .position(|s| *s == step)
            .and_then(|i| steps.get(i + 1))
            .copied()
            .unwrap_or_else(|| self.first_step())
    }

    /// Step every pass ends with.
    pub fn last_step(self) -> Step {
        self.steps()[self.steps().len() - 1]
    }

    /// Returns `true` if `step` closes a pass.
    pub fn ends_pass(self, step: Step) -> bool {
        step == self.last_step()
    }
}

/// Result of one executed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// HTTP 200 and the expected fields were stored.
    Success,
    /// The exchange completed but the server did not answer 200, or a 200
    /// body could not be decoded.
    Failed { status: u16, reason: String },
    /// The request never produced a response.
    Transport(StepError),
    /// A precondition was missing and no request was sent.
    Skipped { reason: String },
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Short label for tallies: `success`, `failed`, `transport`, `skipped`.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed { .. } => "failed",
            Self::Transport(_) => "transport",
            Self::Skipped { .. } => "skipped",
        }
    }
}

/// Executes journey steps for one virtual user.
#[derive(Debug, Clone)]
pub struct Journey {
    client: ApiClient,
    gameplay: GameplaySettings,
    credentials: Option<Credentials>,
}

impl Journey {
    pub fn new(
        client: ApiClient,
        gameplay: GameplaySettings,
        credentials: Option<Credentials>,
    ) -> Self {
        Self {
            client,
            gameplay,
            credentials,
        }
    }

    /// Runs one step against the backend, reading and updating `ctx`.
    pub async fn execute(&self, step: Step, ctx: &mut SessionContext) -> StepOutcome {
        match step {
            Step::Login => self.guest_login(ctx).await,
            Step::CredentialLogin => self.credential_login(ctx).await,
            Step::ValidateToken => self.validate_token(ctx).await,
            Step::LoadHome => self.load_home(ctx).await,
            Step::ClaimReward => self.claim_reward(ctx).await,
            Step::GameplayJoin => self.gameplay_join(ctx).await,
            Step::UpdateScore => self.update_score(ctx).await,
        }
    }

    async fn guest_login(&self, ctx: &mut SessionContext) -> StepOutcome {
        let body = json!({ "deviceId": uuid::Uuid::new_v4().to_string() });
        let outcome = self
            .call(Step::Login, Method::POST, "/api/v1/auth/guest", None, Some(&body))
            .await;
        store_login(Step::Login, ctx, outcome)
    }

    async fn credential_login(&self, ctx: &mut SessionContext) -> StepOutcome {
        let Some(credentials) = &self.credentials else {
            error!(step = %Step::CredentialLogin, "No credentials configured, skipping login.");
            return StepOutcome::Skipped {
                reason: "no credentials configured".to_string(),
            };
        };
        let body = json!({
            "identifier": credentials.identifier,
            "password": credentials.password,
        });
        let outcome = self
            .call(
                Step::CredentialLogin,
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(&body),
            )
            .await;
        store_login(Step::CredentialLogin, ctx, outcome)
    }

    async fn validate_token(&self, ctx: &mut SessionContext) -> StepOutcome {
        let token = bearer(Step::ValidateToken, ctx);
        let outcome = self
            .call(Step::ValidateToken, Method::POST, "/api/v1/auth/validate", token, None)
            .await;
        log_only(Step::ValidateToken, ctx, outcome, "Token validated", "Token validation failed")
    }

    async fn load_home(&self, ctx: &mut SessionContext) -> StepOutcome {
        let token = bearer(Step::LoadHome, ctx);
        let outcome = self
            .call(Step::LoadHome, Method::GET, "/api/v1/home", token, None)
            .await;
        log_only(Step::LoadHome, ctx, outcome, "Home loaded", "Failed to load home")
    }

    async fn claim_reward(&self, ctx: &mut SessionContext) -> StepOutcome {
        let token = bearer(Step::ClaimReward, ctx);
        let body = json!({ "userId": ctx.user_id });
        let outcome = self
            .call(
                Step::ClaimReward,
                Method::POST,
                "/api/v1/rewards/daily/claim",
                token,
                Some(&body),
            )
            .await;
        log_only(Step::ClaimReward, ctx, outcome, "Reward claimed", "Reward claim failed")
    }

    async fn gameplay_join(&self, ctx: &mut SessionContext) -> StepOutcome {
        let match_key = ctx.rotate_match_key();
        let token = bearer(Step::GameplayJoin, ctx);
        let body = json!({
            "matchKey": match_key,
            "mode": self.gameplay.mode,
            "overs": self.gameplay.overs,
            "stake": self.gameplay.stake,
            "targetScore": self.gameplay.target_score,
        });
        let outcome = self
            .call(
                Step::GameplayJoin,
                Method::POST,
                "/api/v1/gameplay/join",
                token,
                Some(&body),
            )
            .await;

        match outcome {
            Ok(response) if response.is_ok() => match response.json_data() {
                Ok(data) => {
                    ctx.apply_join(&data);
                    info!(
                        step = %Step::GameplayJoin,
                        "Gameplay joined -> matchId: {:?}, playerId: {:?}",
                        ctx.match_id,
                        ctx.player_id
                    );
                    StepOutcome::Success
                },
                Err(err) => decode_failure(Step::GameplayJoin, &response, err),
            },
            Ok(response) => failure(
                Step::GameplayJoin,
                &response,
                format!("Gameplay join failed: {}", response.body),
            ),
            Err(err) => transport(Step::GameplayJoin, err),
        }
    }

    async fn update_score(&self, ctx: &mut SessionContext) -> StepOutcome {
        let Some((match_id, player_id)) = ctx.match_slot() else {
            error!(step = %Step::UpdateScore, "Missing matchId or playerId, skipping score update.");
            return StepOutcome::Skipped {
                reason: "missing matchId or playerId".to_string(),
            };
        };

        let path = format!("/api/v1/gameplay/{match_id}/score");
        let body = json!({
            "matchKey": ctx.match_key,
            "scores": [score::generate(player_id)],
            "winner": player_id,
            "targetScore": self.gameplay.target_score,
        });
        let match_id = match_id.to_owned();
        let token = bearer(Step::UpdateScore, ctx);
        let outcome = self
            .call(Step::UpdateScore, Method::POST, &path, token, Some(&body))
            .await;

        match outcome {
            Ok(response) if response.is_ok() => {
                info!(step = %Step::UpdateScore, "Score updated successfully for match: {match_id}");
                StepOutcome::Success
            },
            Ok(response) => failure(
                Step::UpdateScore,
                &response,
                format!("Score update failed: {}", response.body),
            ),
            Err(err) => transport(Step::UpdateScore, err),
        }
    }

    async fn call(
        &self,
        step: Step,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<&Value>,
    ) -> Result<ApiResponse, StepError> {
        self.client
            .send(method, path, token, body)
            .instrument(info_span!("step", step = %step))
            .await
    }
}

/// Returns the token for an authenticated step. A missing token is logged
/// and the request goes out without an `Authorization` header.
fn bearer(step: Step, ctx: &SessionContext) -> Option<&str> {
    let token = ctx.token.as_deref();
    if token.is_none() {
        warn!(step = %step, "No access token in session, sending unauthenticated request.");
    }
    token
}

fn store_login(
    step: Step,
    ctx: &mut SessionContext,
    outcome: Result<ApiResponse, StepError>,
) -> StepOutcome {
    match outcome {
        Ok(response) if response.is_ok() => match response.json_data() {
            Ok(data) => {
                ctx.apply_login(&data);
                info!(step = %step, "Logged in -> user_id: {:?}", ctx.user_id);
                StepOutcome::Success
            },
            Err(err) => decode_failure(step, &response, err),
        },
        Ok(response) => failure(
            step,
            &response,
            format!("Login failed: {}", response.status),
        ),
        Err(err) => transport(step, err),
    }
}

fn log_only(
    step: Step,
    ctx: &SessionContext,
    outcome: Result<ApiResponse, StepError>,
    success_message: &str,
    failure_reason: &str,
) -> StepOutcome {
    match outcome {
        Ok(response) if response.is_ok() => {
            info!(step = %step, "{success_message} for user_id: {:?}", ctx.user_id);
            StepOutcome::Success
        },
        Ok(response) => failure(step, &response, failure_reason.to_string()),
        Err(err) => transport(step, err),
    }
}

fn failure(step: Step, response: &ApiResponse, reason: String) -> StepOutcome {
    error!(step = %step, status = response.status, "{reason}");
    StepOutcome::Failed {
        status: response.status,
        reason,
    }
}

fn decode_failure(step: Step, response: &ApiResponse, err: StepError) -> StepOutcome {
    failure(step, response, format!("Unreadable response body: {err}"))
}

fn transport(step: Step, err: StepError) -> StepOutcome {
    error!(step = %step, "Request failed: {err}");
    StepOutcome::Transport(err)
}
