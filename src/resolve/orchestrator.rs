use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use super::apple::AppleResolver;
use super::discovery::Autodiscover;
use super::input::{infer_show_name, InputKind, ResolutionInput};
use super::spotify::SpotifyResolver;
use super::{Candidate, ResolverSettings, Strategy, StrategyError};
use crate::feed::{FeedValidator, ValidatedFeed, ValidationFailure};
use crate::http::HttpClient;

/// Strategies tried for each kind of input, in order.
pub fn strategy_chain(kind: InputKind) -> &'static [Strategy] {
    match kind {
        InputKind::AppleUrl => &[Strategy::AppleLookup],
        InputKind::SpotifyUrl => &[Strategy::SpotifyTitleSearch],
        InputKind::GenericUrl => &[Strategy::Autodiscovery, Strategy::SiteNameSearch],
        InputKind::SearchTerm => &[Strategy::AppleSearch],
    }
}

/// Why one strategy did not produce a feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    /// The resolver's own request failed, or every candidate was unreachable
    NetworkFailure(String),
    /// A directory API or web page answered, but not with anything usable
    BadResponse(String),
    /// Candidates were fetched but none was RSS or Atom
    NotAFeed(String),
    NoCandidatesFound(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NetworkFailure(detail) => write!(f, "network failure: {detail}"),
            Self::BadResponse(detail) => write!(f, "bad response: {detail}"),
            Self::NotAFeed(detail) => write!(f, "not a feed: {detail}"),
            Self::NoCandidatesFound(detail) => write!(f, "no candidates found: {detail}"),
        }
    }
}

impl From<&StrategyError> for FailureReason {
    fn from(err: &StrategyError) -> Self {
        match err {
            StrategyError::Network(e) => Self::NetworkFailure(e.to_string()),
            StrategyError::BadResponse(detail) => Self::BadResponse(detail.clone()),
        }
    }
}

/// One entry of a failed resolution's report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategyAttempt {
    pub strategy: Strategy,
    pub candidates_tried: usize,
    pub reason: FailureReason,
}

/// Everything that was tried for an input that resolved to nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionFailure {
    pub input: String,
    pub kind: InputKind,
    pub attempts: Vec<StrategyAttempt>,
    /// Show title recovered from a platform that serves no RSS itself.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_title: Option<String>,
}

impl ResolutionFailure {
    /// True when a Spotify show was identified but no public feed matched,
    /// which usually means the show is a platform exclusive.
    pub fn likely_exclusive(&self) -> bool {
        self.kind == InputKind::SpotifyUrl && self.platform_title.is_some()
    }
}

impl fmt::Display for ResolutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no feed found for \"{}\" ({})", self.input, self.kind)?;
        for attempt in &self.attempts {
            write!(
                f,
                "\n  - {}: {} ({} candidate(s) tried)",
                attempt.strategy, attempt.reason, attempt.candidates_tried
            )?;
        }
        if self.likely_exclusive() {
            if let Some(title) = &self.platform_title {
                write!(f, "\n  \"{title}\" is likely exclusive to Spotify")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("nothing to resolve: input is empty")]
    EmptyInput,

    #[error("{0}")]
    StrategiesExhausted(ResolutionFailure),
}

/// Candidates from one strategy plus context for the failure report.
struct Produced {
    candidates: Vec<Candidate>,
    /// Explains an empty candidate list.
    note: Option<String>,
    platform_title: Option<String>,
}

impl Produced {
    fn candidates(candidates: Vec<Candidate>) -> Self {
        Self {
            candidates,
            note: None,
            platform_title: None,
        }
    }
}

/// Runs the strategy chain for an input and returns the first candidate the
/// validator accepts.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    apple: AppleResolver,
    spotify: SpotifyResolver,
    autodiscover: Autodiscover,
    validator: FeedValidator,
}

impl Orchestrator {
    pub fn new(client: HttpClient, settings: &ResolverSettings) -> Self {
        Self {
            apple: AppleResolver::new(client.clone(), settings),
            spotify: SpotifyResolver::new(client.clone(), settings),
            autodiscover: Autodiscover::new(client.clone(), settings),
            validator: FeedValidator::new(client),
        }
    }

    /// Resolves a URL or search term to a validated feed.
    ///
    /// Strategies run in [`strategy_chain`] order and candidates are
    /// validated one at a time; the first feed found wins and nothing after
    /// it is fetched. A URL rejected once is not fetched again within the
    /// same call.
    ///
    /// # Errors
    ///
    /// [`ResolveError::EmptyInput`] for blank input, otherwise
    /// [`ResolveError::StrategiesExhausted`] with one attempt per strategy.
    pub async fn resolve(&self, raw: &str) -> Result<ValidatedFeed, ResolveError> {
        let input = ResolutionInput::parse(raw).ok_or(ResolveError::EmptyInput)?;
        tracing::info!(input = %input, kind = %input.kind(), "Resolving");

        let mut attempts = Vec::new();
        let mut rejected: HashSet<String> = HashSet::new();
        let mut platform_title = None;

        for &strategy in strategy_chain(input.kind()) {
            let produced = match self.produce(strategy, &input).await {
                Ok(produced) => produced,
                Err(e) => {
                    tracing::warn!(%strategy, error = %e, "Strategy failed");
                    attempts.push(StrategyAttempt {
                        strategy,
                        candidates_tried: 0,
                        reason: FailureReason::from(&e),
                    });
                    continue;
                }
            };
            if produced.platform_title.is_some() {
                platform_title = produced.platform_title;
            }

            if produced.candidates.is_empty() {
                let note = produced
                    .note
                    .unwrap_or_else(|| "strategy produced no candidates".to_owned());
                tracing::debug!(%strategy, note = %note, "No candidates");
                attempts.push(StrategyAttempt {
                    strategy,
                    candidates_tried: 0,
                    reason: FailureReason::NoCandidatesFound(note),
                });
                continue;
            }

            let mut tried = 0;
            let mut last_failure = None;
            for candidate in &produced.candidates {
                if !rejected.insert(candidate.url.clone()) {
                    tracing::debug!(url = %candidate.url, "Skipping already rejected candidate");
                    continue;
                }
                tried += 1;

                match self.validator.validate(candidate).await {
                    Ok(feed) => {
                        tracing::info!(
                            url = %feed.url(),
                            %strategy,
                            dialect = %feed.dialect(),
                            "Resolved feed"
                        );
                        return Ok(feed);
                    }
                    Err(failure) => {
                        tracing::debug!(url = %candidate.url, error = %failure, "Candidate rejected");
                        last_failure = Some(failure);
                    }
                }
            }

            let reason = match last_failure {
                Some(failure) => reason_for_rejections(&failure, tried),
                None => FailureReason::NoCandidatesFound(
                    "every candidate was already rejected by an earlier strategy".to_owned(),
                ),
            };
            tracing::warn!(%strategy, reason = %reason, "Strategy exhausted");
            attempts.push(StrategyAttempt {
                strategy,
                candidates_tried: tried,
                reason,
            });
        }

        Err(ResolveError::StrategiesExhausted(ResolutionFailure {
            input: input.as_str().to_owned(),
            kind: input.kind(),
            attempts,
            platform_title,
        }))
    }

    async fn produce(
        &self,
        strategy: Strategy,
        input: &ResolutionInput,
    ) -> Result<Produced, StrategyError> {
        match strategy {
            Strategy::AppleLookup => {
                let candidates = self.apple.lookup_by_id(input.as_str()).await?;
                Ok(Produced {
                    note: candidates
                        .is_empty()
                        .then(|| "no podcast id in the URL or no feed listed for it".to_owned()),
                    ..Produced::candidates(candidates)
                })
            }
            Strategy::SpotifyTitleSearch => {
                let resolution = self.spotify.resolve(input.as_str()).await;
                let note = match &resolution.title {
                    None => "no show title from oEmbed; the show may be private or the URL is not a show"
                        .to_owned(),
                    Some(title) => format!("no public feed matched \"{title}\""),
                };
                Ok(Produced {
                    candidates: resolution.candidates,
                    note: Some(note),
                    platform_title: resolution.title,
                })
            }
            Strategy::Autodiscovery => Ok(Produced::candidates(
                self.autodiscover.resolve(input.as_str()).await?,
            )),
            Strategy::AppleSearch => Ok(Produced {
                note: Some(format!("no directory results for \"{}\"", input.as_str())),
                ..Produced::candidates(
                    self.apple
                        .search_by_title(input.as_str(), Strategy::AppleSearch)
                        .await?,
                )
            }),
            Strategy::SiteNameSearch => {
                let Some(name) = input.url().and_then(infer_show_name) else {
                    return Ok(Produced {
                        note: Some("could not infer a show name from the URL".to_owned()),
                        ..Produced::candidates(Vec::new())
                    });
                };
                let candidates = self
                    .apple
                    .search_by_title(&name, Strategy::SiteNameSearch)
                    .await?;
                Ok(Produced {
                    note: Some(format!("no directory results for \"{name}\"")),
                    ..Produced::candidates(candidates)
                })
            }
        }
    }
}

/// Summarizes why every validated candidate of a strategy was rejected,
/// using the last rejection as the example.
fn reason_for_rejections(last: &ValidationFailure, tried: usize) -> FailureReason {
    let detail = format!("{tried} candidate(s) rejected, last: {last}");
    if last.is_network() {
        FailureReason::NetworkFailure(detail)
    } else {
        FailureReason::NotAFeed(detail)
    }
}
