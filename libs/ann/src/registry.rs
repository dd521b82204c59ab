//! Static registry of known annotation sub-field names
//!
//! Maps sub-field names to their decode strategy using a compile-time
//! perfect hash map (phf) for O(1) lookups with zero runtime allocation.
//! The set is closed: names absent from the registry decode as plain
//! strings.

use phf::phf_map;

use crate::types::FieldKind;

static FIELDS_BY_NAME: phf::Map<&'static str, FieldKind> = phf_map! {
    // SnpEff (ANN): https://pcingola.github.io/SnpEff/adds/VCFannotationformat_v1.0.pdf
    "Allele" => FieldKind::Str,
    "Annotation" => FieldKind::Terms,
    "Annotation_Impact" => FieldKind::Str,
    "Gene_Name" => FieldKind::Str,
    "Gene_ID" => FieldKind::Str,
    "Feature_Type" => FieldKind::Str,
    "Feature_ID" => FieldKind::Str,
    "Transcript_BioType" => FieldKind::Str,
    "Rank" => FieldKind::NumberTotal,
    "HGVS.c" => FieldKind::Str,
    "HGVS.p" => FieldKind::Str,
    "cDNA.pos / cDNA.length" => FieldKind::PosRangeSnpEff,
    "CDS.pos / CDS.length" => FieldKind::PosRangeSnpEff,
    "AA.pos / AA.length" => FieldKind::PosRangeSnpEff,
    "Distance" => FieldKind::Int,
    "ERRORS / WARNINGS / INFO" => FieldKind::Str,

    // VEP (CSQ): https://www.ensembl.org/info/docs/tools/vep/vep_formats.html
    "Consequence" => FieldKind::Terms,
    "IMPACT" => FieldKind::Str,
    "SYMBOL" => FieldKind::Str,
    "SYMBOL_SOURCE" => FieldKind::Str,
    "Gene" => FieldKind::Str,
    "Feature_type" => FieldKind::Str,
    "Feature" => FieldKind::Str,
    "BIOTYPE" => FieldKind::Str,
    "EXON" => FieldKind::RangeTotal,
    "INTRON" => FieldKind::RangeTotal,
    "HGVSc" => FieldKind::Str,
    "HGVSp" => FieldKind::Str,
    "cDNA_position" => FieldKind::PosRangeVep,
    "CDS_position" => FieldKind::PosRangeVep,
    "Protein_position" => FieldKind::PosRangeVep,
    "Amino_acids" => FieldKind::Str,
    "Codons" => FieldKind::Str,
    "Existing_variation" => FieldKind::List { sep: '&' },
    "DISTANCE" => FieldKind::Int,
    "STRAND" => FieldKind::Int,
    "ALLELE_NUM" => FieldKind::Int,
    "FLAGS" => FieldKind::List { sep: '&' },
    "HGNC_ID" => FieldKind::Str,
    "CANONICAL" => FieldKind::Flag { truthy: "YES" },
    "MANE" => FieldKind::Str,
    "TSL" => FieldKind::Int,
    "APPRIS" => FieldKind::Str,
    "CCDS" => FieldKind::Str,
    "ENSP" => FieldKind::Str,
    "SWISSPROT" => FieldKind::Str,
    "TREMBL" => FieldKind::Str,
    "UNIPARC" => FieldKind::Str,
    "SIFT" => FieldKind::Scores,
    "PolyPhen" => FieldKind::Scores,
    "DOMAINS" => FieldKind::Pairs,
    "miRNA" => FieldKind::List { sep: '&' },
    "MOTIF_NAME" => FieldKind::Str,
    "MOTIF_POS" => FieldKind::Int,
    "HIGH_INF_POS" => FieldKind::Flag { truthy: "Y" },
    "MOTIF_SCORE_CHANGE" => FieldKind::Float,
    "CLIN_SIG" => FieldKind::List { sep: '&' },
    "SOMATIC" => FieldKind::List { sep: '&' },
    "PHENO" => FieldKind::List { sep: '&' },
    "PUBMED" => FieldKind::List { sep: '&' },
    "VAR_SYNONYMS" => FieldKind::Str,

    // VEP allele frequencies (all 32-bit floats)
    "AF" => FieldKind::Float,
    "AFR_AF" => FieldKind::Float,
    "AMR_AF" => FieldKind::Float,
    "EAS_AF" => FieldKind::Float,
    "EUR_AF" => FieldKind::Float,
    "SAS_AF" => FieldKind::Float,
    "AA_AF" => FieldKind::Float,
    "EA_AF" => FieldKind::Float,
    "MAX_AF" => FieldKind::Float,
    "MAX_AF_POPS" => FieldKind::List { sep: '&' },
    "gnomAD_AF" => FieldKind::Float,
    "gnomAD_AFR_AF" => FieldKind::Float,
    "gnomAD_AMR_AF" => FieldKind::Float,
    "gnomAD_ASJ_AF" => FieldKind::Float,
    "gnomAD_EAS_AF" => FieldKind::Float,
    "gnomAD_FIN_AF" => FieldKind::Float,
    "gnomAD_NFE_AF" => FieldKind::Float,
    "gnomAD_OTH_AF" => FieldKind::Float,
    "gnomAD_SAS_AF" => FieldKind::Float,
    "gnomADe_AF" => FieldKind::Float,
    "gnomADg_AF" => FieldKind::Float,
};

/// Decode strategy for a sub-field name, if it is registered.
pub fn field_kind(name: &str) -> Option<FieldKind> {
    FIELDS_BY_NAME.get(name).copied()
}
