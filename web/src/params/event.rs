use crate::error::Error;
use eventsource::Event;
use serde::Deserialize;

/// Body of a broadcast or publish request.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct EventParams {
    pub(crate) id: Option<String>,
    pub(crate) event: Option<String>,
    /// May span several lines; each becomes its own `data` field.
    #[serde(default)]
    pub(crate) data: String,
    pub(crate) retry: Option<u64>,
}

impl TryFrom<EventParams> for Event {
    type Error = Error;

    fn try_from(params: EventParams) -> Result<Self, Self::Error> {
        let mut event = Event::new();

        if let Some(id) = params.id {
            single_line("id", &id)?;
            event.set_id(id);
        }
        if let Some(event_type) = params.event {
            single_line("event", &event_type)?;
            event.set_type(event_type);
        }
        if let Some(retry) = params.retry {
            event.set_retry(retry);
        }
        // CRLF input would leave a stray '\r' on every line otherwise
        event.append_data(&params.data.replace('\r', ""));

        Ok(event)
    }
}

fn single_line(field: &str, value: &str) -> Result<(), Error> {
    if value.contains(['\n', '\r']) {
        return Err(Error::invalid_event(format!(
            "{field} must not contain line breaks"
        )));
    }
    Ok(())
}
