use crate::{error::FailureReport, response::EventRecord};
use calcium_common::metrics::{
    failures,
    names::{CELLS_PROCESSED, FAILURES, NO_RESPONSES, RESPONSES},
    responses,
};
use metrics::counter;

pub fn describe() {
    metrics::describe_counter!(
        CELLS_PROCESSED,
        metrics::Unit::Count,
        "Number of cells analysed without failure"
    );
    metrics::describe_counter!(
        FAILURES,
        metrics::Unit::Count,
        "Number of cells or stimuli isolated because of a failure"
    );
    metrics::describe_counter!(
        RESPONSES,
        metrics::Unit::Count,
        "Number of (cell, stimulus) pairs with a response"
    );
    metrics::describe_counter!(
        NO_RESPONSES,
        metrics::Unit::Count,
        "Number of (cell, stimulus) pairs without a response"
    );
}

pub(crate) fn record_failure(report: &FailureReport) {
    counter!(FAILURES, &[failures::get_label(report.kind)]).increment(1);
}

pub(crate) fn record_cell(records: &[EventRecord]) {
    counter!(CELLS_PROCESSED).increment(1);
    for record in records {
        let labels = [responses::get_label(&record.stimulus_name)];
        if record.is_response() {
            counter!(RESPONSES, &labels).increment(1);
        } else {
            counter!(NO_RESPONSES, &labels).increment(1);
        }
    }
}
