use log::info;

use super::{sign_in, Portal, NO_SCALING_MODEL};
use crate::browser::{Locator, UiSession};
use crate::error::Result;
use crate::flatfile::{FlatfileSchema, WEST2_SCHEMA};
use crate::request::{Credentials, Database};

const SIGN_IN_URL: &str = "https://ngawest2.berkeley.edu/users/sign_in?unauthenticated=true";
const DATABASE_ENTRY: &str = "/html/body/div/div[8]/div/table[1]/tbody/tr[1]/td[2]/a/img";
const SEARCH_BUTTON: &str = "button[onclick='uncheck_plot_selected();reset_selectedResult();OnSubmit();']";
/// SRSS = 1, RotD100 = 2, RotD50 = 3, GeoMean = 4, H1 = 5, H2 = 6, V = 7.
const ROTD50_ORDINATE: &str = "3";

pub struct NgaWest2;

impl Portal for NgaWest2 {
    fn database(&self) -> Database {
        Database::NgaWest2
    }

    fn sign_in_url(&self) -> &'static str {
        SIGN_IN_URL
    }

    fn schema(&self) -> &'static FlatfileSchema {
        &WEST2_SCHEMA
    }

    fn expected_file_name(&self, rsn: u64, source_path: &str) -> String {
        format!("RSN{}_{}", rsn, source_path.replace('\\', "_"))
    }

    fn authenticate(&self, session: &UiSession, credentials: &Credentials) -> Result<()> {
        sign_in(session, credentials, Locator::Id("user_submit"))
    }

    fn enter_database(&self, session: &UiSession) -> Result<()> {
        session.click(Locator::XPath(DATABASE_ENTRY))
    }

    fn select_model(&self, session: &UiSession) -> Result<()> {
        session.select_value(Locator::Name("spectra[NGAInputData_NGAModelSelection]"), NO_SCALING_MODEL)?;
        session.click(Locator::Css("button[onclick='OnSubmit();']"))
    }

    fn submit_search(&self, session: &UiSession, rsn_query: &str) -> Result<()> {
        session.fill(Locator::Id("search_search_nga_number"), rsn_query)?;
        session.click(Locator::Css(SEARCH_BUTTON))
    }

    fn select_spectrum(&self, session: &UiSession) -> Result<()> {
        session.select_value(Locator::Name("search[SRkey]"), ROTD50_ORDINATE)
    }

    fn trigger_export(&self, session: &UiSession) -> Result<()> {
        // The export button asks for confirmation twice before the download starts.
        session.accept_dialogs()?;
        session.click(Locator::Css("button[onclick='getSelectedResult(true)']"))?;
        info!("Requested NGA West2 record export");
        Ok(())
    }
}
