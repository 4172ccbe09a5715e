//! Weighted selection of record styles and services.

use crate::errors::{GeneratorError, Result};
use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use std::fmt::Display;
use std::str::FromStr;

/// Picks one of a fixed set of options according to integer weights.
#[derive(Debug, Clone)]
pub struct WeightedChoice<T> {
    options: Vec<T>,
    weights: Vec<u32>,
    /// `None` for a single-option choice
    index: Option<WeightedIndex<u32>>,
}

impl<T: Copy> WeightedChoice<T> {
    pub fn new(entries: Vec<(T, u32)>) -> Result<Self> {
        let (options, weights): (Vec<T>, Vec<u32>) = entries.into_iter().unzip();
        let index = WeightedIndex::new(weights.iter().copied())
            .map_err(|e| GeneratorError::Config(format!("invalid weights: {}", e)))?;

        Ok(Self {
            options,
            weights,
            index: Some(index),
        })
    }

    /// Every option equally likely.
    pub fn uniform(options: &[T]) -> Result<Self> {
        Self::new(options.iter().map(|option| (*option, 1)).collect())
    }

    /// Always the same option.
    pub fn only(option: T) -> Self {
        Self {
            options: vec![option],
            weights: vec![1],
            index: None,
        }
    }

    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> T {
        match &self.index {
            Some(index) => self.options[index.sample(rng)],
            None => self.options[0],
        }
    }

    /// Options that can actually be drawn.
    pub fn options(&self) -> impl Iterator<Item = T> + '_ {
        self.options
            .iter()
            .zip(&self.weights)
            .filter(|(_, weight)| **weight > 0)
            .map(|(option, _)| *option)
    }
}

/// Parse `name=weight,name=weight` into a choice. Names omitted from the list
/// get weight zero.
pub fn parse_weights<T>(input: &str) -> Result<WeightedChoice<T>>
where
    T: Copy + PartialEq + FromStr,
    T::Err: Display,
{
    let mut entries: Vec<(T, u32)> = Vec::new();

    for pair in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (name, weight) = pair
            .split_once('=')
            .ok_or_else(|| {
                GeneratorError::Config(format!("expected name=weight, got '{}'", pair))
            })?;

        let option = name
            .trim()
            .parse::<T>()
            .map_err(|e| GeneratorError::Config(e.to_string()))?;
        let weight = weight.trim().parse::<u32>().map_err(|e| {
            GeneratorError::Config(format!("invalid weight for '{}': {}", name.trim(), e))
        })?;

        if entries.iter().any(|(existing, _)| *existing == option) {
            return Err(GeneratorError::Config(format!(
                "'{}' listed more than once",
                name.trim()
            )));
        }
        entries.push((option, weight));
    }

    if entries.is_empty() {
        return Err(GeneratorError::Config("no weights given".to_string()));
    }

    WeightedChoice::new(entries)
}
