//! Plain-text bill statements for printing or handing to the patient.

use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use crate::error::Result;
use crate::models::BillStatement;

const RULE: &str = "---------------------------";

pub fn render(statement: &BillStatement) -> String {
    let bill = &statement.bill;
    let charges = &bill.charges;
    format!(
        "==== Medicare Bill ===\n\
         Bill ID: {id}\n\
         Date: {date}\n\
         \n\
         Patient ID: {pid}\n\
         Name: {name}\n\
         \n\
         Consultation: {consultation:.2}\n\
         Medicine: {medicine:.2}\n\
         Room: {room:.2}\n\
         Other: {other:.2}\n\
         {RULE}\n\
         Total: {total:.2}\n",
        id = bill.id,
        date = bill.created_at.format("%Y-%m-%dT%H:%M:%S"),
        pid = bill.pid,
        name = statement.patient_name,
        consultation = charges.consultation,
        medicine = charges.medicine,
        room = charges.room,
        other = charges.other,
        total = bill.total,
    )
}

pub fn file_name(bill_id: i64) -> String {
    format!("bill_{}.txt", bill_id)
}

/// Write the statement to `<dir>/bill_<id>.txt`, creating `dir` if needed.
#[instrument(skip(statement), fields(bill_id = statement.bill.id))]
pub async fn write_to_dir(dir: &Path, statement: &BillStatement) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(file_name(statement.bill.id));
    tokio::fs::write(&path, render(statement)).await?;
    info!(path = %path.display(), "Bill exported");
    Ok(path)
}
