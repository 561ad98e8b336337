use std::path::Path;
use log::{debug, info};

use crate::error::Result;
use crate::flatfile::Flatfile;
use crate::request::{Database, Direction};

/// Maps `(rsn, direction)` pairs to the file names the portal puts in its archive.
pub struct RecordLocator {
    database: Database,
}

impl RecordLocator {
    pub fn new(database: Database) -> Self {
        RecordLocator { database }
    }

    /// Loads the flatfile and resolves every requested record.
    pub fn locate<P: AsRef<Path>>(
        &self,
        flatfile_path: P,
        rsns: &[u64],
        directions: &[Direction],
    ) -> Result<Vec<String>> {
        let flatfile = Flatfile::load(flatfile_path, self.database.portal().schema())?;
        self.expected_file_names(&flatfile, rsns, directions)
    }

    /// Names are ordered by RSN first, then by direction.
    pub fn expected_file_names(
        &self,
        flatfile: &Flatfile,
        rsns: &[u64],
        directions: &[Direction],
    ) -> Result<Vec<String>> {
        let portal = self.database.portal();
        let mut names = Vec::with_capacity(rsns.len() * directions.len());

        for &rsn in rsns {
            for &direction in directions {
                let source = flatfile.lookup(rsn, direction)?;
                let name = portal.expected_file_name(rsn, source);
                debug!("RSN {} {} -> {}", rsn, direction, name);
                names.push(name);
            }
        }

        info!("Expecting {} record files from {}", names.len(), self.database);
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::fs;

    const WEST2_CSV: &str = "Record Sequence Number,Earthquake Name,File Name (Horizontal 1),File Name (Horizontal 2),File Name (Vertical)\n\
        1,Helena_ Montana-01,HELENA.A\\A-HMC180.AT2,HELENA.A\\A-HMC270.AT2,HELENA.A\\A-HMCDWN.AT2\n\
        6,Imperial Valley-02,IMPVALL.I\\I-ELC180.AT2,IMPVALL.I\\I-ELC270.AT2,IMPVALL.I\\I-ELCUP.AT2\n";

    #[test]
    fn test_west2_names_follow_rsn_then_direction_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("west2.csv");
        fs::write(&path, WEST2_CSV).unwrap();

        let locator = RecordLocator::new(Database::NgaWest2);
        let names = locator
            .locate(&path, &[6, 1], &[Direction::Horizontal1, Direction::Vertical])
            .unwrap();

        assert_eq!(
            names,
            vec![
                "RSN6_IMPVALL.I_I-ELC180.AT2",
                "RSN6_IMPVALL.I_I-ELCUP.AT2",
                "RSN1_HELENA.A_A-HMC180.AT2",
                "RSN1_HELENA.A_A-HMCDWN.AT2",
            ]
        );
    }

    #[test]
    fn test_name_count_is_rsns_times_directions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("west2.csv");
        fs::write(&path, WEST2_CSV).unwrap();

        let directions = [Direction::Horizontal1, Direction::Horizontal2, Direction::Vertical];
        let names = RecordLocator::new(Database::NgaWest2)
            .locate(&path, &[1, 6], &directions)
            .unwrap();
        assert_eq!(names.len(), 2 * 3);
    }

    #[test]
    fn test_sub_names_use_basename_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub.csv");
        fs::write(
            &path,
            "NGAsubRSN,accFilePathH1,accFilePathH2,accFilePathV\n\
             1000001,Chile/ev1/STA_HNE.AT2,Chile\\ev1\\STA_HNN.AT2,Chile/ev1/STA_HNZ.AT2\n",
        )
        .unwrap();

        let names = RecordLocator::new(Database::NgaSub)
            .locate(&path, &[1000001], &[Direction::Horizontal1, Direction::Horizontal2])
            .unwrap();
        assert_eq!(names, vec!["NGAsubRSN1000001_STA_HNE.AT2", "NGAsubRSN1000001_STA_HNN.AT2"]);
    }

    #[test]
    fn test_missing_flatfile_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = RecordLocator::new(Database::NgaSub)
            .locate(dir.path().join("missing.csv"), &[1], &[Direction::Vertical])
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_unknown_rsn_fails_loudly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("west2.csv");
        fs::write(&path, WEST2_CSV).unwrap();

        let err = RecordLocator::new(Database::NgaWest2)
            .locate(&path, &[42], &[Direction::Vertical])
            .unwrap_err();
        assert!(matches!(err, Error::Flatfile(_)));
    }
}
