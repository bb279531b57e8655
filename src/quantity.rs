use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube_quantity::{ParseQuantityError, ParsedQuantity};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
#[error("Invalid quantity {quantity:?}: {error}")]
pub struct QuantityError {
    pub quantity: String,
    #[source]
    pub error: ParseQuantityError,
}

pub fn parse(quantity: &Quantity) -> Result<ParsedQuantity, QuantityError> {
    quantity
        .clone()
        .try_into()
        .map_err(|error| QuantityError {
            quantity: quantity.0.clone(),
            error,
        })
}

/// Returns `true` if `a` is strictly less than `b`.
pub fn is_less(a: &Quantity, b: &Quantity) -> Result<bool, QuantityError> {
    Ok(parse(a)? < parse(b)?)
}
