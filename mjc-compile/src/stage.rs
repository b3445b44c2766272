//! The stage abstraction of the pipeline.
//!
//! A [Stage] transforms one intermediate product into the next against a
//! shared [Context](crate::Context). Stages compose with [Stage::next]
//! into chains whose input is the first stage's input and whose output is
//! the last stage's output.

use crate::{CompileError, Context};

pub trait Stage {
    type Input;
    type Output;

    fn name(&self) -> &'static str;

    fn run(&mut self, input: Self::Input, context: &Context) -> Result<Self::Output, CompileError>;

    fn next<S>(self, stage: S) -> Chain<Self, S>
    where
        Self: Sized,
        S: Stage<Input = Self::Output>,
    {
        Chain { first: self, second: stage }
    }
}

/// Two stages run in sequence.
pub struct Chain<A, B> {
    first: A,
    second: B,
}

impl<A, B> Stage for Chain<A, B>
where
    A: Stage,
    B: Stage<Input = A::Output>,
{
    type Input = A::Input;
    type Output = B::Output;

    fn name(&self) -> &'static str {
        self.second.name()
    }

    fn run(&mut self, input: Self::Input, context: &Context) -> Result<Self::Output, CompileError> {
        let intermediate = self.first.run(input, context)?;
        log::debug!(target: "driver", "stage {} done", self.first.name());
        self.second.run(intermediate, context)
    }
}
