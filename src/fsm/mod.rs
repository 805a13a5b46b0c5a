//! Guarded finite state machine.
//!
//! A transition only becomes visible once the leaving state's `exit` guard and
//! the entering state's `enter` guard have both agreed. `exit` runs before
//! `enter` is known to succeed, so its side effects must be harmless on an
//! aborted transition.

use tracing::{debug, info};

use crate::error::ConfigurationError;

#[async_trait::async_trait(?Send)]
pub trait State<C: ?Sized>: Sized {
    type Error: From<ConfigurationError>;

    fn name(&self) -> &'static str;

    /// Returns the candidate for the next state, or `None` to stay.
    async fn event(&mut self, ctx: &mut C) -> Result<Option<Self>, Self::Error>;

    async fn enter(&mut self, _ctx: &mut C) -> Result<bool, Self::Error> {
        Ok(true)
    }

    async fn exit(&mut self, _ctx: &mut C) -> Result<bool, Self::Error> {
        Ok(true)
    }

    fn entered(&mut self, _ctx: &mut C) {}

    fn exited(&mut self, _ctx: &mut C) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Stayed,
    Declined,
    Committed,
}

pub struct Machine<S> {
    current: S,
}

impl<S> Machine<S> {
    pub async fn start<C: ?Sized>(mut initial: S, ctx: &mut C) -> Result<Self, S::Error>
    where
        S: State<C>,
    {
        if !initial.enter(ctx).await? {
            return Err(ConfigurationError::InitialStateRejected(initial.name()).into());
        }
        initial.entered(ctx);
        Ok(Self { current: initial })
    }

    pub fn current(&self) -> &S {
        &self.current
    }

    pub async fn event<C: ?Sized>(&mut self, ctx: &mut C) -> Result<Transition, S::Error>
    where
        S: State<C>,
    {
        let Some(mut candidate) = self.current.event(ctx).await? else {
            return Ok(Transition::Stayed);
        };

        if !self.current.exit(ctx).await? {
            debug!(
                "{} declined to exit towards {}",
                self.current.name(),
                candidate.name()
            );
            return Ok(Transition::Declined);
        }
        if !candidate.enter(ctx).await? {
            debug!(
                "{} declined entry from {}",
                candidate.name(),
                self.current.name()
            );
            return Ok(Transition::Declined);
        }

        let mut previous = std::mem::replace(&mut self.current, candidate);
        info!("State {} -> {}", previous.name(), self.current.name());
        previous.exited(ctx);
        self.current.entered(ctx);
        Ok(Transition::Committed)
    }
}
