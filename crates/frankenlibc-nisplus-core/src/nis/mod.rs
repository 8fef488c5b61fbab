//! NIS+ result model.
//!
//! A query against the directory returns a [`NisResult`]: a status code, the
//! matching objects in server order, and a paging cookie. Table rows are
//! `Entry` objects carrying their table type tag and column values.

pub mod indexed_name;

pub use indexed_name::{IndexedName, IndexedNameError};

/// NIS+ status codes (`nis_error`), numbered as on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum NisStatus {
    Success = 0,
    SSuccess = 1,
    NotFound = 2,
    SNotFound = 3,
    CacheExpired = 4,
    NameUnreachable = 5,
    UnknownObj = 6,
    TryAgain = 7,
    SystemError = 8,
    ChainBroken = 9,
    Permission = 10,
    NotOwner = 11,
    NotMe = 12,
    NoMemory = 13,
    NameExists = 14,
    NotMaster = 15,
    InvalidObj = 16,
    BadName = 17,
    NoCallback = 18,
    CbResults = 19,
    NoSuchName = 20,
    NotUnique = 21,
    IbModError = 22,
    NoSuchTable = 23,
    TypeMismatch = 24,
    LinkNameError = 25,
    Partial = 26,
    TooManyAttrs = 27,
    RpcError = 28,
    BadAttribute = 29,
    NotSearchable = 30,
    CbError = 31,
    ForeignNs = 32,
    BadObject = 33,
    NotSameObj = 34,
    ModFail = 35,
    BadRequest = 36,
    NotEmpty = 37,
    ColdstartErr = 38,
    Resync = 39,
    Fail = 40,
    Unavail = 41,
    Res2Big = 42,
    SrvAuth = 43,
    ClntAuth = 44,
    NoFileSpace = 45,
    NoProc = 46,
    DumpLater = 47,
}

const ALL_STATUSES: [NisStatus; 48] = [
    NisStatus::Success,
    NisStatus::SSuccess,
    NisStatus::NotFound,
    NisStatus::SNotFound,
    NisStatus::CacheExpired,
    NisStatus::NameUnreachable,
    NisStatus::UnknownObj,
    NisStatus::TryAgain,
    NisStatus::SystemError,
    NisStatus::ChainBroken,
    NisStatus::Permission,
    NisStatus::NotOwner,
    NisStatus::NotMe,
    NisStatus::NoMemory,
    NisStatus::NameExists,
    NisStatus::NotMaster,
    NisStatus::InvalidObj,
    NisStatus::BadName,
    NisStatus::NoCallback,
    NisStatus::CbResults,
    NisStatus::NoSuchName,
    NisStatus::NotUnique,
    NisStatus::IbModError,
    NisStatus::NoSuchTable,
    NisStatus::TypeMismatch,
    NisStatus::LinkNameError,
    NisStatus::Partial,
    NisStatus::TooManyAttrs,
    NisStatus::RpcError,
    NisStatus::BadAttribute,
    NisStatus::NotSearchable,
    NisStatus::CbError,
    NisStatus::ForeignNs,
    NisStatus::BadObject,
    NisStatus::NotSameObj,
    NisStatus::ModFail,
    NisStatus::BadRequest,
    NisStatus::NotEmpty,
    NisStatus::ColdstartErr,
    NisStatus::Resync,
    NisStatus::Fail,
    NisStatus::Unavail,
    NisStatus::Res2Big,
    NisStatus::SrvAuth,
    NisStatus::ClntAuth,
    NisStatus::NoFileSpace,
    NisStatus::NoProc,
    NisStatus::DumpLater,
];

impl NisStatus {
    /// Decode a wire status. Unknown codes yield `None`.
    pub fn from_code(code: u32) -> Option<Self> {
        ALL_STATUSES.get(code as usize).copied()
    }

    #[inline]
    pub fn code(self) -> u32 {
        self as u32
    }

    /// `NIS_SUCCESS` and `NIS_S_SUCCESS` (served from cache) both count.
    #[inline]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success | Self::SSuccess)
    }
}

impl std::fmt::Display for NisStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

/// `zotypes`: the kind of a directory object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Bogus,
    NoObject,
    Directory,
    Group,
    Table,
    #[default]
    Entry,
    Link,
    Private,
}

/// One directory object. For `Entry` objects `columns` holds the row values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NisObject {
    pub kind: ObjectKind,
    /// Table type tag of an entry (`en_type`), e.g. `services_tbl`.
    pub entry_type: Vec<u8>,
    pub columns: Vec<Vec<u8>>,
}

impl NisObject {
    /// Builds an entry object from column strings.
    pub fn entry<T, C>(entry_type: T, columns: C) -> Self
    where
        T: Into<Vec<u8>>,
        C: IntoIterator,
        C::Item: Into<Vec<u8>>,
    {
        Self {
            kind: ObjectKind::Entry,
            entry_type: entry_type.into(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Column text as C sees it: the stored bytes up to the first NUL.
    pub fn column_text(&self, col: usize) -> Option<&[u8]> {
        self.columns.get(col).map(|raw| until_nul(raw))
    }
}

#[inline]
pub(crate) fn until_nul(raw: &[u8]) -> &[u8] {
    match raw.iter().position(|&b| b == 0) {
        Some(end) => &raw[..end],
        None => raw,
    }
}

/// Opaque paging token handed back by `first_entry`/`next_entry`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cookie(pub Vec<u8>);

/// Reply to a directory query (`nis_result`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NisResult {
    pub status: NisStatus,
    pub objects: Vec<NisObject>,
    pub cookie: Cookie,
}

impl NisResult {
    pub fn with_status(status: NisStatus) -> Self {
        Self {
            status,
            objects: Vec::new(),
            cookie: Cookie::default(),
        }
    }

    pub fn success(objects: Vec<NisObject>, cookie: Cookie) -> Self {
        Self {
            status: NisStatus::Success,
            objects,
            cookie,
        }
    }

    /// First object of the reply (`NIS_RES_OBJECT`).
    pub fn first(&self) -> Option<&NisObject> {
        self.objects.first()
    }
}
