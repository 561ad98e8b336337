use log::info;

use super::{base_name, sign_in, Portal, NO_SCALING_MODEL};
use crate::browser::{Locator, UiSession};
use crate::error::Result;
use crate::flatfile::{FlatfileSchema, SUB_SCHEMA};
use crate::request::{Credentials, Database};

const SIGN_IN_URL: &str = "http://ec2-35-167-122-9.us-west-2.compute.amazonaws.com/users/sign_in";
const PORTAL_ENTRY: &str = "/html/body/div/ul/li[1]/h3/a";
const UNSCALED_DOWNLOAD: &str = r#"//*[@id="chart_Div_DownloadButtons"]/fieldset/input[2]"#;
const AGREE_LINK: &str = ">> Click here to Agree & Download <<";

pub struct NgaSub;

impl Portal for NgaSub {
    fn database(&self) -> Database {
        Database::NgaSub
    }

    fn sign_in_url(&self) -> &'static str {
        SIGN_IN_URL
    }

    fn schema(&self) -> &'static FlatfileSchema {
        &SUB_SCHEMA
    }

    fn expected_file_name(&self, rsn: u64, source_path: &str) -> String {
        format!("{}{}_{}", SUB_SCHEMA.rsn, rsn, base_name(source_path))
    }

    fn authenticate(&self, session: &UiSession, credentials: &Credentials) -> Result<()> {
        sign_in(session, credentials, Locator::Name("commit"))
    }

    fn enter_database(&self, session: &UiSession) -> Result<()> {
        session.click(Locator::XPath(PORTAL_ENTRY))
    }

    fn select_model(&self, session: &UiSession) -> Result<()> {
        session.select_value(Locator::Name("ngasubduction[NGAModelSelection]"), NO_SCALING_MODEL)?;
        // "Start project"
        session.click(Locator::Name("commit"))
    }

    fn submit_search(&self, session: &UiSession, rsn_query: &str) -> Result<()> {
        session.fill(Locator::Id("ngasubduction_search_rsn_list"), rsn_query)
    }

    /// The ordinate belongs to the search form, so the form is submitted here.
    fn select_spectrum(&self, session: &UiSession) -> Result<()> {
        session.select_value(Locator::Id("ngasubduction_search_spectrumresultant"), "RotD50")?;
        session.click(Locator::Name("user_submitAction"))
    }

    fn trigger_export(&self, session: &UiSession) -> Result<()> {
        session.click(Locator::XPath(UNSCALED_DOWNLOAD))?;
        session.click(Locator::LinkText(AGREE_LINK))?;
        info!("Accepted NGA Sub download terms");
        Ok(())
    }
}
