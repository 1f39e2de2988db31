// Resource usage snapshot of a reaped process
#![allow(dead_code)]

use serde::{Deserialize, Serialize};

/// OS-reported resource consumption.
///
/// Only ever built from the `rusage` returned when the process is reaped; all
/// zeros when no data is available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rusage {
    /// User CPU time in seconds
    pub utime: f64,
    /// System CPU time in seconds
    pub stime: f64,
    pub maxrss: i64,
    pub ixrss: i64,
    pub idrss: i64,
    pub isrss: i64,
    pub minflt: i64,
    pub majflt: i64,
    pub nswap: i64,
    pub inblock: i64,
    // Key kept as clients already read it
    #[serde(rename = "oublick")]
    pub oublock: i64,
    pub msgsnd: i64,
    pub msgrcv: i64,
    pub nsignals: i64,
    pub nvcsw: i64,
    pub nivcsw: i64,
}

impl Rusage {
    pub fn from_raw(ru: &libc::rusage) -> Self {
        Self {
            utime: seconds(&ru.ru_utime),
            stime: seconds(&ru.ru_stime),
            maxrss: ru.ru_maxrss as i64,
            ixrss: ru.ru_ixrss as i64,
            idrss: ru.ru_idrss as i64,
            isrss: ru.ru_isrss as i64,
            minflt: ru.ru_minflt as i64,
            majflt: ru.ru_majflt as i64,
            nswap: ru.ru_nswap as i64,
            inblock: ru.ru_inblock as i64,
            oublock: ru.ru_oublock as i64,
            msgsnd: ru.ru_msgsnd as i64,
            msgrcv: ru.ru_msgrcv as i64,
            nsignals: ru.ru_nsignals as i64,
            nvcsw: ru.ru_nvcsw as i64,
            nivcsw: ru.ru_nivcsw as i64,
        }
    }
}

fn seconds(tv: &libc::timeval) -> f64 {
    tv.tv_sec as f64 + tv.tv_usec as f64 / 1_000_000.0
}
