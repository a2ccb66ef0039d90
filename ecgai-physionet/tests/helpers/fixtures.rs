//! Reference table fixtures
//!
//! Records with distinct low/high resolution filenames and a handful of SCP
//! statements, in the layout the archive uses.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use ecgai_physionet::{PtbXl, PtbXlConfig};

use super::fakes::{CountingSource, FakeSignalReader};

pub const METADATA_CSV: &str = "\
ecg_id,patient_id,age,sex,height,weight,report,scp_codes,strat_fold,filename_lr,filename_hr
1,15709.0,56.0,1,,63.0,sinusrhythmus periphere niederspannung,\"{'NORM': 100.0, 'LVOLT': 0.0, 'SR': 0.0}\",3,records100/00000/00001_lr,records500/00000/00001_hr
2,13243.0,19.0,0,,70.0,\"sinusbradykardie, sonst normales ekg\",\"{'NORM': 80.0, 'SBRAD': 0.0}\",2,records100/00000/00002_lr,records500/00000/00002_hr
1001,20372.0,,0,,,unknown code record,\"{'NOTACODE': 50.0}\",1,records100/01000/01001_lr,records500/01000/01001_hr
";

pub const SCP_STATEMENTS_CSV: &str = "\
,description,diagnostic,form,rhythm
NORM,normal ECG,1.0,,
LVOLT,low QRS voltages in the frontal and horizontal leads,,1.0,
SR,sinus rhythm,,,1.0
SBRAD,sinus bradycardia,,,1.0
";

/// Accessor over fixture tables plus handles on its fakes
pub struct TestDataset {
    pub temp_dir: TempDir,
    pub ptbxl: PtbXl,
    pub source: Arc<CountingSource>,
    pub reader: Arc<FakeSignalReader>,
}

impl TestDataset {
    pub fn data_location(&self) -> PathBuf {
        self.temp_dir.path().join("data")
    }

    /// Put both tables on disk so no download is needed
    pub fn seed_tables(&self) {
        seed_tables(&self.data_location());
    }
}

pub fn seed_tables(dir: &Path) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join("ptbxl_database.csv"), METADATA_CSV).unwrap();
    std::fs::write(dir.join("scp_statements.csv"), SCP_STATEMENTS_CSV).unwrap();
}

/// Accessor whose reference tables come from the fixtures above
pub fn test_ptbxl() -> TestDataset {
    test_ptbxl_with_reader(FakeSignalReader::new())
}

pub fn test_ptbxl_with_reader(reader: FakeSignalReader) -> TestDataset {
    let temp_dir = TempDir::new().unwrap();
    let source = Arc::new(CountingSource::new(METADATA_CSV, SCP_STATEMENTS_CSV));
    let reader = Arc::new(reader);

    let config = PtbXlConfig {
        data_location: temp_dir.path().join("data"),
        ..PtbXlConfig::default()
    };
    let ptbxl = PtbXl::with_services(config, source.clone(), reader.clone());

    TestDataset {
        temp_dir,
        ptbxl,
        source,
        reader,
    }
}
