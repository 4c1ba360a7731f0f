use crate::error::HandlerError;
use crate::model::BookmarkChange;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridCommand {
    GetRecords,
    SaveRecords,
    DeleteRecords,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: u32,
    pub limit: u32,
}

/// The raw key/value pairs of a grid request, in the order they were sent.
///
/// The widget encodes nested data with bracketed keys (`changes[0][title]`,
/// `selected[]`), which a flat struct cannot express, so lookups happen here.
#[derive(Debug, Default)]
pub struct GridForm {
    pairs: Vec<(String, String)>,
}

impl GridForm {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    /// First value sent for `key`.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn command(&self) -> Result<GridCommand, HandlerError> {
        match self.first("cmd") {
            Some("get-records") => Ok(GridCommand::GetRecords),
            Some("save-records") => Ok(GridCommand::SaveRecords),
            Some("delete-records") => Ok(GridCommand::DeleteRecords),
            Some(other) => Err(HandlerError::UnknownCommand(other.to_string())),
            None => Err(HandlerError::MissingParam("cmd".to_string())),
        }
    }

    pub fn page(&self) -> Result<Page, HandlerError> {
        Ok(Page {
            offset: self.number("offset")?,
            limit: self.number("limit")?,
        })
    }

    /// Rows of a `save-records` request, read until the first index without
    /// a `recid`.
    pub fn changes(&self) -> Result<Vec<BookmarkChange>, HandlerError> {
        let mut changes = Vec::new();

        for i in 0.. {
            let recid_key = format!("changes[{i}][recid]");
            let Some(recid) = self.first(&recid_key) else {
                break;
            };
            let id = parse_number(&recid_key, recid)?;
            let field = |name: &str| self.first(&format!("changes[{i}][{name}]")).map(str::to_string);

            changes.push(BookmarkChange {
                id,
                title: field("title"),
                url: field("url"),
                note: field("note"),
                tags: field("tags"),
            });
        }

        Ok(changes)
    }

    /// Ids of a `delete-records` request. Accepts `selected[]` as well as
    /// indexed `selected[N]` keys.
    pub fn selected_ids(&self) -> Result<Vec<i32>, HandlerError> {
        self.pairs
            .iter()
            .filter(|(k, _)| k.starts_with("selected[") && k.ends_with(']'))
            .map(|(k, v)| parse_number(k, v))
            .collect()
    }

    fn number<T: std::str::FromStr>(&self, key: &str) -> Result<T, HandlerError> {
        let value = self
            .first(key)
            .ok_or_else(|| HandlerError::MissingParam(key.to_string()))?;
        parse_number(key, value)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, HandlerError> {
    value.trim().parse().map_err(|_| HandlerError::InvalidParam {
        name: key.to_string(),
        value: value.to_string(),
    })
}
