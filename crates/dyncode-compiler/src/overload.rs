//! Overload selection.
//!
//! Every candidate whose parameters accept the arguments through implicit
//! conversions is applicable. The applicable candidate with the lowest total
//! conversion cost wins; two candidates sharing the lowest cost make the
//! call ambiguous.

use dyncode_core::RuntimeType;

use crate::conversion::{self, Conversion};
use crate::expr_info::ExprType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverloadError {
    NoMatch,
    Ambiguous,
}

/// The chosen candidate and the conversion for each argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub candidate: usize,
    pub conversions: Vec<Conversion>,
}

pub fn select<'a>(
    candidates: impl IntoIterator<Item = &'a [RuntimeType]>,
    args: &[ExprType],
) -> Result<Selection, OverloadError> {
    let mut best: Option<(u32, Selection)> = None;
    let mut tied = false;

    for (candidate, params) in candidates.into_iter().enumerate() {
        let Some(conversions) = applicable(params, args) else {
            continue;
        };
        let cost = conversions.iter().map(|c| c.cost).sum();
        match &best {
            Some((best_cost, _)) if cost > *best_cost => {}
            Some((best_cost, _)) if cost == *best_cost => tied = true,
            _ => {
                tied = false;
                best = Some((
                    cost,
                    Selection {
                        candidate,
                        conversions,
                    },
                ));
            }
        }
    }

    match best {
        None => Err(OverloadError::NoMatch),
        Some(_) if tied => Err(OverloadError::Ambiguous),
        Some((_, selection)) => Ok(selection),
    }
}

fn applicable(params: &[RuntimeType], args: &[ExprType]) -> Option<Vec<Conversion>> {
    if params.len() != args.len() {
        return None;
    }
    params
        .iter()
        .zip(args)
        .map(|(param, arg)| conversion::implicit(arg, param))
        .collect()
}

/// `int, string` style list of argument types for diagnostics.
pub fn describe_args(args: &[ExprType]) -> String {
    args.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
