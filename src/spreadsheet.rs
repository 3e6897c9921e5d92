use crate::error::{HeatError, Result};
use crate::sheet::Sheet;
use serde::{Deserialize, Serialize};

/// An ordered collection of named sheets, the unit that gets saved and loaded.
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct Spreadsheet {
    pub sheets: Vec<Sheet>,
}

impl Spreadsheet {
    pub fn new() -> Self {
        Spreadsheet::default()
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name().to_string()).collect()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.sheets.iter().position(|s| s.name() == name)
    }

    pub fn sheet(&self, name: &str) -> Result<&Sheet> {
        self.sheets
            .iter()
            .find(|s| s.name() == name)
            .ok_or_else(|| HeatError::SheetNotFound(name.to_string()))
    }

    pub fn sheet_mut(&mut self, name: &str) -> Result<&mut Sheet> {
        self.sheets
            .iter_mut()
            .find(|s| s.name() == name)
            .ok_or_else(|| HeatError::SheetNotFound(name.to_string()))
    }

    /// Appends a sheet; an existing sheet with the same name is replaced in place.
    pub fn add_sheet(&mut self, sheet: Sheet) {
        match self.position(sheet.name()) {
            Some(i) => self.sheets[i] = sheet,
            None => self.sheets.push(sheet),
        }
    }

    /// Returns the named sheet, creating an empty one at the end if needed.
    pub fn insert_sheet(&mut self, name: &str) -> &mut Sheet {
        let index = match self.position(name) {
            Some(i) => i,
            None => {
                self.sheets.push(Sheet::new(name, 0, 0));
                self.sheets.len() - 1
            }
        };
        &mut self.sheets[index]
    }

    /// Renames `from` to `to`. Fails without touching anything when `from`
    /// is missing or another sheet is already called `to`.
    pub fn rename_sheet(&mut self, from: &str, to: &str) -> Result<()> {
        let index = self
            .position(from)
            .ok_or_else(|| HeatError::SheetNotFound(from.to_string()))?;
        if from != to && self.position(to).is_some() {
            return Err(HeatError::SheetExists(to.to_string()));
        }
        self.sheets[index].set_name(to);
        Ok(())
    }

    pub fn delete_sheet(&mut self, name: &str) -> Result<Sheet> {
        let index = self
            .position(name)
            .ok_or_else(|| HeatError::SheetNotFound(name.to_string()))?;
        Ok(self.sheets.remove(index))
    }
}
