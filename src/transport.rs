//! # BLE Transport
//!
//! Delivers an encoded print frame to a connected printer.
//!
//! ## Endpoint discovery
//!
//! Supported printers expose a vendor GATT service whose UUID starts with
//! `0000ff`. The first write-capable characteristic under that service is
//! the print endpoint. Discovery runs once per job.
//!
//! ## Chunked writes
//!
//! The payload is split into 20-byte chunks (the usable payload of a
//! default-MTU BLE link) and written sequentially. Each write is bounded
//! by a 5 second timeout; a timeout or platform failure aborts the
//! remaining chunks. Partial transmission is not retried here; retry
//! policy belongs to the caller.

use tokio::time::timeout;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::ble::{CharacteristicInfo, Peripheral};
use crate::error::TransportError;
use crate::printer::config::{CHUNK_SIZE, PRINTER_SERVICE_PREFIX, WRITE_TIMEOUT};

/// Whether a service UUID identifies the printer vendor service.
pub fn is_printer_service(uuid: &Uuid) -> bool {
    let text = uuid.to_string();
    text.len() >= PRINTER_SERVICE_PREFIX.len()
        && text[..PRINTER_SERVICE_PREFIX.len()].eq_ignore_ascii_case(PRINTER_SERVICE_PREFIX)
}

/// Locate the printer service and its writable characteristic.
pub async fn find_printer_endpoint<P: Peripheral>(
    peripheral: &P,
) -> Result<(Uuid, CharacteristicInfo), TransportError> {
    let services = peripheral.services().await?;

    let service = services
        .into_iter()
        .find(|s| is_printer_service(&s.uuid))
        .ok_or(TransportError::NoPrinterService)?;

    let characteristic = service
        .characteristics
        .iter()
        .copied()
        .find(CharacteristicInfo::writable)
        .ok_or(TransportError::NoWritableCharacteristic)?;

    Ok((service.uuid, characteristic))
}

/// Write `payload` to the printer in fixed-size chunks.
///
/// Write-with-response is used when the characteristic supports it,
/// otherwise write-without-response. Aborts on the first failed or
/// timed-out chunk.
pub async fn send<P: Peripheral>(peripheral: &P, payload: &[u8]) -> Result<(), TransportError> {
    let (service, characteristic) = find_printer_endpoint(peripheral).await?;
    let with_response = characteristic.write;

    let total = payload.len().div_ceil(CHUNK_SIZE);
    debug!(
        bytes = payload.len(),
        chunks = total,
        with_response,
        "sending print frame"
    );

    for (index, chunk) in payload.chunks(CHUNK_SIZE).enumerate() {
        let write = peripheral.write(service, characteristic.uuid, chunk, with_response);
        match timeout(WRITE_TIMEOUT, write).await {
            Ok(Ok(())) => trace!(chunk = index, len = chunk.len(), "chunk written"),
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(TransportError::WriteTimeout(index, total)),
        }
    }

    Ok(())
}
