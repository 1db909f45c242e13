//! Shared test harness modules for the cities CLI.

use super::*;

mod commands;
mod helpers;
