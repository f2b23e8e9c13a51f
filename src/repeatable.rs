//! Which MARC-21 bibliographic fields may occur more than once per record.
//!
//! The table is a closed `match`; it covers every standard tag the library
//! knows about. Local tags (see [`Tag::is_local`]) are repeatable without a
//! lookup.

use crate::error::{MarcError, Result};
use crate::tag::Tag;

/// Whether fields tagged `tag` may repeat within one record.
///
/// # Errors
///
/// Returns [`MarcError::UnknownTag`] for a non-local tag missing from the table.
///
/// ```
/// use marcio::{is_repeatable_field, Tag};
///
/// assert!(!is_repeatable_field(Tag::new("100").unwrap()).unwrap());
/// assert!(is_repeatable_field(Tag::new("650").unwrap()).unwrap());
/// assert!(is_repeatable_field(Tag::new("LOK").unwrap()).unwrap());
/// ```
pub fn is_repeatable_field(tag: Tag) -> Result<bool> {
    if tag.is_local() {
        return Ok(true);
    }

    match tag.as_str() {
        // Control fields
        "001" | "003" | "005" | "008" => Ok(false),
        "006" | "007" => Ok(true),

        // Numbers and codes
        "010" | "018" | "036" | "038" | "040" | "042" | "043" | "044" | "045" | "066" => Ok(false),
        "013" | "015" | "016" | "017" | "020" | "022" | "024" | "025" | "026" | "027" | "028"
        | "030" | "031" | "032" | "033" | "034" | "035" | "037" | "041" | "046" | "047" | "048"
        | "050" | "051" | "052" | "055" | "060" | "061" | "070" | "071" | "072" | "074" | "080"
        | "082" | "083" | "084" | "085" | "086" | "088" => Ok(true),

        // Main entries, titles, edition, imprint
        "100" | "110" | "111" | "130" | "240" | "243" | "245" | "254" | "256" | "263" => Ok(false),
        "186" | "210" | "222" | "242" | "246" | "247" | "250" | "255" | "257" | "258" | "260"
        | "264" | "270" => Ok(true),

        // Physical description
        "306" | "310" | "357" | "384" => Ok(false),
        "300" | "307" | "321" | "336" | "337" | "338" | "340" | "342" | "343" | "344" | "345"
        | "346" | "347" | "348" | "351" | "352" | "355" | "362" | "363" | "365" | "366" | "370"
        | "377" | "380" | "381" | "382" | "383" | "385" | "386" | "388" => Ok(true),

        // Series and notes
        "514" => Ok(false),
        "490" | "500" | "501" | "502" | "504" | "505" | "506" | "507" | "508" | "510" | "511"
        | "513" | "515" | "516" | "518" | "520" | "521" | "522" | "524" | "525" | "526" | "530"
        | "533" | "534" | "535" | "536" | "538" | "540" | "541" | "542" | "545" | "546" | "547"
        | "550" | "552" | "555" | "556" | "561" | "562" | "563" | "565" | "567" | "580" | "581"
        | "583" | "584" | "585" | "586" | "588" => Ok(true),

        // Subject access
        "652" => Ok(false),
        "600" | "601" | "610" | "611" | "630" | "647" | "648" | "650" | "651" | "653" | "654"
        | "655" | "657" | "658" | "662" => Ok(true),

        // Added entries and linking entries
        "700" | "710" | "711" | "720" | "730" | "740" | "751" | "752" | "754" | "758" | "760"
        | "762" | "765" | "767" | "770" | "772" | "773" | "774" | "775" | "776" | "777" | "780"
        | "785" | "786" | "787" => Ok(true),

        // Series added entries, holdings, alternate graphics
        "841" | "842" => Ok(false),
        "800" | "810" | "811" | "830" | "843" | "844" | "845" | "850" | "852" | "853" | "854"
        | "855" | "856" | "863" | "864" | "865" | "866" | "867" | "868" | "876" | "877" | "878"
        | "880" | "882" | "883" | "884" | "885" | "886" | "887" => Ok(true),

        _ => Err(MarcError::UnknownTag(tag)),
    }
}
