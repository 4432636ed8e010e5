//! Decoding of the product search response into [`Device`]s.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use helty_types::Device;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Product {
    #[serde(rename = "_id")]
    id: Option<String>,
    serial_number: Option<String>,
    board_serial_number: Option<String>,
    product_type: Option<ProductType>,
    cloud_board: Option<CloudBoard>,
    current_installation: Option<Installation>,
    client_info: Option<ClientInfo>,
}

#[derive(Debug, Default, Deserialize)]
struct ProductType {
    model: Option<String>,
    line: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CloudBoard {
    #[serde(rename = "_id")]
    id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Installation {
    name: Option<String>,
    place: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientInfo {
    name: Option<String>,
    last_name: Option<String>,
    mail: Option<String>,
}

/// Extract the devices owned by `account_email` from a search page.
///
/// The search returns every product the account can see, including ones
/// shared by other owners. Only products whose owner mail matches the account
/// (case-insensitively) are kept; with no account email every owned product
/// is kept. Products without an owner mail are never kept. Entries that are
/// malformed or lack one of the three identifiers are skipped. Response order
/// is preserved.
pub fn devices_from_search(page: &Value, account_email: Option<&str>) -> Vec<Device> {
    let Some(entries) = page.get("data").and_then(Value::as_array) else {
        debug!("product search returned no data list");
        return Vec::new();
    };

    let account = account_email.map(str::to_lowercase);
    let mut devices = Vec::with_capacity(entries.len());

    for entry in entries {
        let product = match Product::deserialize(entry) {
            Ok(product) => product,
            Err(e) => {
                warn!(error = %e, "skipping malformed product entry");
                continue;
            }
        };

        let client = product.client_info.unwrap_or_default();
        let owner_email = match client.mail {
            Some(mail) if !mail.is_empty() => mail,
            _ => {
                debug!(product_id = ?product.id, "skipping product without owner");
                continue;
            }
        };
        if let Some(account) = &account {
            if owner_email.to_lowercase() != *account {
                debug!(product_id = ?product.id, "skipping product owned by another account");
                continue;
            }
        }

        let (Some(product_id), Some(serial_number), Some(board_serial_number)) = (
            product.id.filter(|s| !s.is_empty()),
            product.serial_number.filter(|s| !s.is_empty()),
            product.board_serial_number.filter(|s| !s.is_empty()),
        ) else {
            warn!("skipping product without id, serial or board serial");
            continue;
        };

        let product_type = product.product_type.unwrap_or_default();
        let installation_label = match product.current_installation {
            Some(Installation {
                name: None,
                place: None,
            })
            | None => String::new(),
            Some(Installation { name, place }) => format!(
                "{} - {}",
                name.unwrap_or_default(),
                place.unwrap_or_default()
            ),
        };
        let owner_name = format!(
            "{} {}",
            client.name.unwrap_or_default(),
            client.last_name.unwrap_or_default()
        )
        .trim()
        .to_string();

        devices.push(Device {
            product_id,
            serial_number,
            board_serial_number,
            model: product_type.model.unwrap_or_else(|| "Unknown".to_string()),
            product_line: product_type.line.unwrap_or_default(),
            board_id: product.cloud_board.and_then(|b| b.id),
            installation_label,
            owner_name,
            owner_email,
        });
    }

    devices
}
