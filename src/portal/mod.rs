pub mod sub;
pub mod west2;

use log::info;
use url::Url;

use crate::browser::{login_rejection, Locator, SessionState, UiSession};
use crate::error::{Error, Result};
use crate::flatfile::FlatfileSchema;
use crate::request::{Credentials, Database, DownloadRequest};

/// "No scaling" / "No target spectrum" in both portals' model selectors.
pub const NO_SCALING_MODEL: &str = "88";

/// One strategy per PEER database: flatfile schema, archive file naming and the
/// sequence of UI steps that ends in an archive download.
pub trait Portal: Sync {
    fn database(&self) -> Database;

    fn sign_in_url(&self) -> &'static str;

    fn schema(&self) -> &'static FlatfileSchema;

    /// Name the record carries inside the downloaded archive.
    fn expected_file_name(&self, rsn: u64, source_path: &str) -> String;

    fn authenticate(&self, session: &UiSession, credentials: &Credentials) -> Result<()>;

    fn enter_database(&self, session: &UiSession) -> Result<()>;

    fn select_model(&self, session: &UiSession) -> Result<()>;

    fn submit_search(&self, session: &UiSession, rsn_query: &str) -> Result<()>;

    fn select_spectrum(&self, session: &UiSession) -> Result<()>;

    fn trigger_export(&self, session: &UiSession) -> Result<()>;
}

pub fn sign_in_url(portal: &dyn Portal) -> Result<Url> {
    Url::parse(portal.sign_in_url()).map_err(|e| {
        Error::Configuration(format!("bad sign-in URL for {}: {}", portal.database(), e))
    })
}

/// Drives the session from `Start` to `ExportTriggered`. Any missing control aborts.
pub fn run_workflow(portal: &dyn Portal, session: &mut UiSession, request: &DownloadRequest) -> Result<()> {
    info!("Starting {} download of {} records", portal.database(), request.record_sequence_numbers().len());
    session.open(&sign_in_url(portal)?)?;

    portal.authenticate(session, request.credentials())?;
    session.advance(SessionState::Authenticated)?;

    portal.enter_database(session)?;
    session.advance(SessionState::PortalEntered)?;

    portal.select_model(session)?;
    session.advance(SessionState::ModelSelected)?;

    portal.submit_search(session, &request.rsn_query())?;
    session.advance(SessionState::SearchSubmitted)?;

    portal.select_spectrum(session)?;
    session.advance(SessionState::SpectrumSelected)?;

    portal.trigger_export(session)?;
    session.advance(SessionState::ExportTriggered)
}

/// Both portals use the same Devise sign-in form; only the submit control differs.
fn sign_in(session: &UiSession, credentials: &Credentials, submit: Locator<'_>) -> Result<()> {
    session.fill(Locator::Name("user[email]"), &credentials.email)?;
    session.fill(Locator::Name("user[password]"), &credentials.password)?;
    session.click(submit)?;
    session.wait_for_navigation()?;

    if let Some(alert) = login_rejection(&session.page_html()?) {
        return Err(Error::Authentication(format!("{} rejected {}: {}", submit, credentials.email, alert)));
    }
    info!("Signed in as {}", credentials.email);
    Ok(())
}

/// Last component of a flatfile path, whichever separator the flatfile used.
fn base_name(path: &str) -> &str {
    path.rsplit(|c| c == '/' || c == '\\').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_in_urls_parse() {
        let west2 = sign_in_url(Database::NgaWest2.portal()).unwrap();
        assert_eq!(west2.host_str(), Some("ngawest2.berkeley.edu"));
        assert_eq!(west2.scheme(), "https");

        let sub = sign_in_url(Database::NgaSub.portal()).unwrap();
        assert_eq!(sub.path(), "/users/sign_in");
    }

    #[test]
    fn test_portal_matches_database() {
        for db in [Database::NgaWest2, Database::NgaSub] {
            assert_eq!(db.portal().database(), db);
        }
    }

    #[test]
    fn test_base_name_handles_both_separators() {
        assert_eq!(base_name("a/b/c.AT2"), "c.AT2");
        assert_eq!(base_name(r"a\b\c.AT2"), "c.AT2");
        assert_eq!(base_name("c.AT2"), "c.AT2");
    }
}
