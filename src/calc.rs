//! Small arithmetic helpers.

use crate::utils::error::{AppError, Result};

pub fn add(x: i64, y: i64) -> Result<i64> {
    x.checked_add(y).ok_or_else(|| AppError::ArithmeticError {
        message: format!("{} + {}", x, y),
    })
}

pub fn subtract(x: i64, y: i64) -> Result<i64> {
    x.checked_sub(y).ok_or_else(|| AppError::ArithmeticError {
        message: format!("{} - {}", x, y),
    })
}
